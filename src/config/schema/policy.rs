use crate::security::RiskLevel;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a matching rule does to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Allow,
    Deny,
    Warn,
    RequireApproval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRuleConfig {
    pub id: String,
    pub action: RuleAction,
    /// Regex tested against the tool name.
    pub tool_pattern: String,
    #[serde(default)]
    pub description: String,
    /// Regexes tested against stringified argument values; all must match.
    #[serde(default)]
    pub arg_patterns: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_auto_approve_below")]
    pub auto_approve_below: RiskLevel,
    #[serde(default = "default_always_require_above")]
    pub always_require_above: RiskLevel,
}

fn default_auto_approve_below() -> RiskLevel {
    RiskLevel::Medium
}

fn default_always_require_above() -> RiskLevel {
    RiskLevel::High
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            auto_approve_below: default_auto_approve_below(),
            always_require_above: default_always_require_above(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub thresholds: RiskThresholds,
    /// Evaluated in order; first match wins.
    #[serde(default = "default_rules")]
    pub rules: Vec<PolicyRuleConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            rules: default_rules(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.thresholds.auto_approve_below > self.thresholds.always_require_above {
            anyhow::bail!(
                "policy.thresholds.auto_approve_below must be <= policy.thresholds.always_require_above"
            );
        }
        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                anyhow::bail!("policy.rules contains duplicate id {}", rule.id);
            }
        }
        Ok(())
    }
}

fn rule(
    id: &str,
    action: RuleAction,
    tool_pattern: &str,
    args: &[(&str, &str)],
    description: &str,
) -> PolicyRuleConfig {
    PolicyRuleConfig {
        id: id.into(),
        action,
        tool_pattern: tool_pattern.into(),
        description: description.into(),
        arg_patterns: args
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    }
}

pub fn default_rules() -> Vec<PolicyRuleConfig> {
    vec![
        rule(
            "deny-rm-rf-root",
            RuleAction::Deny,
            "^shell$",
            &[("command", r"rm\s+-rf\s+/")],
            "Recursive delete from filesystem root",
        ),
        rule(
            "deny-fork-bomb",
            RuleAction::Deny,
            "^shell$",
            &[("command", r":\(\)\s*\{\s*:\|:&\s*\};:")],
            "Fork bomb",
        ),
        rule(
            "allow-fs-read",
            RuleAction::Allow,
            "^filesystem$",
            &[("action", "^(read|list|exists|stat)$")],
            "Read-only filesystem access",
        ),
        rule(
            "approve-fs-delete",
            RuleAction::RequireApproval,
            "^filesystem$",
            &[("action", "^delete$")],
            "File deletion requires approval",
        ),
        rule(
            "approve-social-post",
            RuleAction::RequireApproval,
            "^(social|post)",
            &[],
            "Publishing to social platforms requires approval",
        ),
        rule(
            "allow-memory",
            RuleAction::Allow,
            "^memory",
            &[],
            "Memory operations are always allowed",
        ),
    ]
}
