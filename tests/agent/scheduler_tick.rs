use serde_json::json;

use forgeclaw::config::SchedulerConfig;
use forgeclaw::scheduler::Scheduler;
use forgeclaw::store::{TaskStatus, TimelineEventType};

use super::agent_harness::{AgentHarness, text_completion, tool_completion};

fn single_task(harness: &AgentHarness) -> Scheduler {
    let config = SchedulerConfig {
        max_tasks_seed_per_tick: 1,
        max_tasks_run_per_tick: 1,
        ..SchedulerConfig::default()
    };
    Scheduler::new(
        harness.store.clone(),
        harness.orchestrator.clone(),
        config,
        harness.workspace(),
    )
}

#[tokio::test]
async fn seeded_task_writes_and_verifies_its_artifact() {
    let h = AgentHarness::start().await;
    h.reply(tool_completion(
        "filesystem",
        &json!({
            "action": "write",
            "path": "data/artifacts/scout-brief.md",
            "content": "# Demand signal\n- proof: https://example.com/thread"
        }),
    ))
    .await;
    h.reply(text_completion(
        "OUTPUT_PATHS:\n- ./data/artifacts/scout-brief.md\nSUMMARY:\nCaptured one demand signal.",
    ))
    .await;

    let report = single_task(&h).tick().await;
    assert_eq!(report.seeded, 1);
    assert_eq!(report.executed, 1);
    assert!(report.error.is_none());

    let artifact = h.workspace().join("data/artifacts/scout-brief.md");
    assert!(artifact.is_file());

    let tasks = h
        .store
        .list_tasks(5, Some(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].goal.starts_with("[Scout] "));
    assert!(
        tasks[0]
            .result_summary
            .as_deref()
            .unwrap()
            .contains("Verified output paths:")
    );

    // The instruction reaches the model as the user turn.
    let bodies = h.request_bodies().await;
    let first_messages = bodies[0]["messages"].as_array().unwrap();
    let instruction = first_messages.last().unwrap()["content"].as_str().unwrap();
    assert!(instruction.starts_with("AUTONOMY EXECUTION MODE - PHASE 4"));
    assert!(instruction.contains("Track: Scout"));

    let events = h.store.timeline(50, None).await.unwrap();
    for expected in [
        TimelineEventType::PlanCreated,
        TimelineEventType::Message,
        TimelineEventType::ToolCall,
        TimelineEventType::PlanStep,
    ] {
        assert!(
            events.iter().any(|event| event.event_type == expected),
            "missing {expected} event"
        );
    }
}

#[tokio::test]
async fn answer_without_artifacts_fails_validation() {
    let h = AgentHarness::start().await;
    h.reply(text_completion("I researched the market and it looks promising."))
        .await;

    let report = single_task(&h).tick().await;
    assert_eq!(report.executed, 1);

    let failed = h
        .store
        .list_tasks(5, Some(TaskStatus::Failed))
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    let summary = failed[0].result_summary.as_deref().unwrap();
    assert!(summary.starts_with("Task failed validation\nReason: Missing OUTPUT_PATHS block"));
    assert!(summary.ends_with("I researched the market and it looks promising."));
}
