use serde_json::json;

use forgeclaw::agent::{ApprovalOutcome, Channel, FailureKind, TurnOutcome};
use forgeclaw::store::{ApprovalStatus, MemoryKind, TimelineEventType};

use super::agent_harness::{AgentHarness, text_completion, tool_completion};

#[tokio::test]
async fn memory_tool_call_feeds_the_final_answer() {
    let h = AgentHarness::start().await;
    h.reply(tool_completion(
        "memory",
        &json!({"action": "store", "text": "Invoices go out on Fridays", "type": "decision"}),
    ))
    .await;
    h.reply(text_completion("Noted: invoices go out on Fridays.")).await;

    let outcome = h
        .orchestrator
        .process_message("remember that invoices go out on Fridays", Channel::Cli)
        .await;
    assert_eq!(
        outcome,
        TurnOutcome::Answer("Noted: invoices go out on Fridays.".into())
    );

    let stored = h.store.search_memories("invoices Fridays", 5).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].kind, MemoryKind::Decision);

    let bodies = h.request_bodies().await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["tools"].as_array().unwrap().len(), 3);
    assert!(bodies[1].get("tools").is_none());
    let follow_up = bodies[1]["messages"].as_array().unwrap();
    assert!(
        follow_up
            .iter()
            .any(|m| m["content"].as_str().unwrap().starts_with("Tool memory result:"))
    );

    let calls = h
        .store
        .timeline(10, Some(TimelineEventType::ToolCall))
        .await
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].summary.starts_with("memory("));
    assert!(calls[0].summary.ends_with("success"));
}

#[tokio::test]
async fn file_deletion_waits_for_approval() {
    let h = AgentHarness::start().await;
    let target = h.workspace().join("notes/old.md");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "stale").unwrap();

    h.reply(tool_completion(
        "filesystem",
        &json!({"action": "delete", "path": "notes/old.md"}),
    ))
    .await;

    let outcome = h
        .orchestrator
        .process_message("clean up notes/old.md", Channel::Telegram)
        .await;
    let TurnOutcome::ApprovalRequired {
        approval_id,
        message,
    } = outcome
    else {
        panic!("expected approval, got {outcome:?}");
    };
    assert!(message.starts_with("**Approval Required**"));
    assert!(message.contains("File deletion requires approval"));
    assert!(target.exists());
    assert_eq!(h.request_bodies().await.len(), 1);

    let pending = h.orchestrator.pending_approvals().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, approval_id);

    let approved = h.orchestrator.approve_action(&approval_id).await.unwrap();
    let ApprovalOutcome::Executed { tool, output } = &approved else {
        panic!("expected execution, got {approved:?}");
    };
    assert_eq!(tool, "filesystem");
    assert!(output.starts_with("Deleted file: "));
    assert!(!target.exists());

    let again = h.orchestrator.approve_action(&approval_id).await.unwrap();
    assert_eq!(
        again,
        ApprovalOutcome::AlreadyResolved {
            id: approval_id.clone(),
            status: ApprovalStatus::Approved,
        }
    );
}

#[tokio::test]
async fn root_wipe_is_denied_before_execution() {
    let h = AgentHarness::start().await;
    h.reply(tool_completion("shell", &json!({"command": "rm -rf / --no-preserve-root"})))
        .await;

    let outcome = h
        .orchestrator
        .process_message("free up some disk space", Channel::Cli)
        .await;
    let TurnOutcome::Failed { kind, message } = outcome else {
        panic!("expected denial, got {outcome:?}");
    };
    assert_eq!(kind, FailureKind::Denied);
    assert!(message.contains("Policy denied: shell"));

    let errors = h
        .store
        .timeline(10, Some(TimelineEventType::Error))
        .await
        .unwrap();
    assert_eq!(errors[0].payload["kind"], "denied");
    assert!(
        h.store
            .timeline(10, Some(TimelineEventType::ToolCall))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn provider_outage_becomes_a_failed_turn() {
    let h = AgentHarness::start().await;
    // Nothing mounted: every completion request gets a 404.

    let outcome = h
        .orchestrator
        .process_message("hello?", Channel::Dashboard)
        .await;
    let TurnOutcome::Failed { kind, message } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(kind, FailureKind::Error);
    assert!(message.contains("404"));
}
