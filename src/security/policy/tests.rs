use super::*;
use crate::config::default_rules;
use serde_json::json;
use std::collections::BTreeMap;

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test args must be an object"),
    }
}

fn default_engine() -> PolicyEngine {
    PolicyEngine::new(&PolicyConfig::default()).unwrap()
}

fn engine_with(rules: Vec<PolicyRuleConfig>) -> PolicyEngine {
    PolicyEngine::new(&PolicyConfig {
        thresholds: RiskThresholds::default(),
        rules,
    })
    .unwrap()
}

fn rule(id: &str, action: RuleAction, tool: &str, arg: Option<(&str, &str)>) -> PolicyRuleConfig {
    let mut arg_patterns = BTreeMap::new();
    if let Some((k, v)) = arg {
        arg_patterns.insert(k.to_string(), v.to_string());
    }
    PolicyRuleConfig {
        id: id.into(),
        action,
        tool_pattern: tool.into(),
        description: format!("rule {id}"),
        arg_patterns,
    }
}

// ── Rule matching ───────────────────────────────────────────

#[test]
fn denies_recursive_root_delete() {
    let engine = default_engine();
    let err = engine
        .evaluate(
            "shell",
            &args(json!({"command": "rm -rf /"})),
            RiskLevel::Medium,
        )
        .unwrap_err();
    assert_eq!(err.tool, "shell");
    assert_eq!(err.rule_id.as_deref(), Some("deny-rm-rf-root"));
}

#[test]
fn allows_filesystem_reads() {
    let verdict = default_engine()
        .evaluate(
            "filesystem",
            &args(json!({"action": "read", "path": "notes.md"})),
            RiskLevel::Low,
        )
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::Allow);
    assert_eq!(verdict.rule_id.as_deref(), Some("allow-fs-read"));
}

#[test]
fn filesystem_delete_requires_approval() {
    let verdict = default_engine()
        .evaluate(
            "filesystem",
            &args(json!({"action": "delete", "path": "old.md"})),
            RiskLevel::Low,
        )
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::RequireApproval);
    assert_eq!(verdict.reason, "File deletion requires approval");
}

#[test]
fn social_posting_requires_approval() {
    let verdict = default_engine()
        .evaluate(
            "social_post",
            &args(json!({"text": "hello"})),
            RiskLevel::High,
        )
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::RequireApproval);
}

#[test]
fn memory_tools_are_allowed_regardless_of_risk() {
    let verdict = default_engine()
        .evaluate("memory_store", &Map::new(), RiskLevel::Critical)
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::Allow);
}

#[test]
fn first_matching_rule_wins() {
    let engine = engine_with(vec![
        rule("warn-all-shell", RuleAction::Warn, "^shell$", None),
        rule("deny-shell", RuleAction::Deny, "^shell$", None),
    ]);
    let verdict = engine
        .evaluate("shell", &args(json!({"command": "ls"})), RiskLevel::Medium)
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::Warn);
    assert_eq!(verdict.rule_id.as_deref(), Some("warn-all-shell"));
}

#[test]
fn every_arg_pattern_must_match() {
    let mut both = rule("both", RuleAction::Deny, "^http$", Some(("method", "^DELETE$")));
    both.arg_patterns.insert("url".into(), "internal".into());
    let engine = engine_with(vec![both]);

    let only_method = engine.evaluate(
        "http",
        &args(json!({"method": "DELETE", "url": "https://example.com"})),
        RiskLevel::Low,
    );
    assert!(only_method.is_ok());

    let both_match = engine.evaluate(
        "http",
        &args(json!({"method": "DELETE", "url": "https://internal.local"})),
        RiskLevel::Low,
    );
    assert!(both_match.is_err());
}

#[test]
fn missing_argument_matches_as_empty_string() {
    let engine = engine_with(vec![rule(
        "empty-cmd",
        RuleAction::RequireApproval,
        "^shell$",
        Some(("command", "^$")),
    )]);
    let verdict = engine
        .evaluate("shell", &Map::new(), RiskLevel::Low)
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::RequireApproval);
}

#[test]
fn non_string_arguments_match_on_json_text() {
    let engine = engine_with(vec![rule(
        "big-count",
        RuleAction::Warn,
        "^batch$",
        Some(("count", r"^\d{3,}$")),
    )]);
    let verdict = engine
        .evaluate("batch", &args(json!({"count": 1000})), RiskLevel::None)
        .unwrap();
    assert_eq!(verdict.decision, PolicyDecision::Warn);
}

// ── Threshold fallback ──────────────────────────────────────

#[test]
fn threshold_fallback_covers_every_level() {
    let engine = engine_with(Vec::new());
    let decide = |risk| {
        engine
            .evaluate("unmatched", &Map::new(), risk)
            .unwrap()
            .decision
    };
    assert_eq!(decide(RiskLevel::None), PolicyDecision::Allow);
    assert_eq!(decide(RiskLevel::Low), PolicyDecision::Allow);
    assert_eq!(decide(RiskLevel::Medium), PolicyDecision::Warn);
    assert_eq!(decide(RiskLevel::High), PolicyDecision::RequireApproval);
    assert_eq!(decide(RiskLevel::Critical), PolicyDecision::RequireApproval);
}

#[test]
fn threshold_reasons_name_the_level() {
    let engine = engine_with(Vec::new());
    let high = engine
        .evaluate("x", &Map::new(), RiskLevel::High)
        .unwrap();
    assert_eq!(high.reason, "Risk level 3 exceeds threshold");
    assert!(high.rule_id.is_none());

    let medium = engine
        .evaluate("x", &Map::new(), RiskLevel::Medium)
        .unwrap();
    assert_eq!(medium.reason, "Medium risk level 2");
}

// ── Construction ────────────────────────────────────────────

#[test]
fn invalid_regex_fails_construction() {
    let err = PolicyEngine::new(&PolicyConfig {
        thresholds: RiskThresholds::default(),
        rules: vec![rule("broken", RuleAction::Allow, "(", None)],
    })
    .unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn default_rules_compile() {
    let engine = default_engine();
    assert_eq!(engine.rule_count(), default_rules().len());
}
