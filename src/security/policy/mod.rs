mod types;

pub use types::{PolicyDecision, PolicyVerdict};

use crate::config::{PolicyConfig, PolicyRuleConfig, RiskThresholds, RuleAction};
use crate::error::{ConfigError, PolicyDenied};
use crate::security::RiskLevel;
use regex::Regex;
use serde_json::{Map, Value};

#[derive(Debug)]
struct CompiledRule {
    id: String,
    action: RuleAction,
    tool_pattern: Regex,
    arg_patterns: Vec<(String, Regex)>,
    description: String,
}

impl CompiledRule {
    fn compile(rule: &PolicyRuleConfig) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRule {
            rule: rule.id.clone(),
            message,
        };
        let tool_pattern = Regex::new(&rule.tool_pattern)
            .map_err(|e| invalid(format!("tool_pattern: {e}")))?;
        let arg_patterns = rule
            .arg_patterns
            .iter()
            .map(|(key, pattern)| {
                Regex::new(pattern)
                    .map(|re| (key.clone(), re))
                    .map_err(|e| invalid(format!("arg_patterns.{key}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: rule.id.clone(),
            action: rule.action,
            tool_pattern,
            arg_patterns,
            description: rule.description.clone(),
        })
    }

    fn matches(&self, tool: &str, args: &Map<String, Value>) -> bool {
        self.tool_pattern.is_match(tool)
            && self
                .arg_patterns
                .iter()
                .all(|(key, pattern)| pattern.is_match(&stringify_arg(args.get(key))))
    }
}

/// Missing and null arguments compare as the empty string; strings compare
/// by content; anything else by its JSON text.
fn stringify_arg(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Rule-based risk gate in front of every tool call.
///
/// Rules are compiled once at construction and never change afterwards; a
/// restart is required to pick up edits to `config.toml`.
#[derive(Debug)]
pub struct PolicyEngine {
    rules: Vec<CompiledRule>,
    thresholds: RiskThresholds,
}

impl PolicyEngine {
    pub fn new(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let rules = config
            .rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(rules = rules.len(), "policy rules compiled");
        Ok(Self {
            rules,
            thresholds: config.thresholds,
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Decide what happens to a tool call.
    ///
    /// A matching deny rule is returned as `Err(PolicyDenied)`; every other
    /// outcome is a verdict. First matching rule wins, then the numeric
    /// thresholds apply.
    pub fn evaluate(
        &self,
        tool: &str,
        args: &Map<String, Value>,
        risk: RiskLevel,
    ) -> Result<PolicyVerdict, PolicyDenied> {
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(tool, args)) {
            let decision = match rule.action {
                RuleAction::Deny => {
                    tracing::warn!(tool, rule = %rule.id, "policy denied tool call");
                    return Err(PolicyDenied {
                        tool: tool.to_string(),
                        reason: rule.description.clone(),
                        rule_id: Some(rule.id.clone()),
                    });
                }
                RuleAction::Allow => PolicyDecision::Allow,
                RuleAction::Warn => PolicyDecision::Warn,
                RuleAction::RequireApproval => PolicyDecision::RequireApproval,
            };
            return Ok(PolicyVerdict {
                decision,
                reason: rule.description.clone(),
                rule_id: Some(rule.id.clone()),
            });
        }

        let verdict = if risk >= self.thresholds.always_require_above {
            PolicyVerdict::fallback(
                PolicyDecision::RequireApproval,
                format!("Risk level {risk} exceeds threshold"),
            )
        } else if risk < self.thresholds.auto_approve_below {
            PolicyVerdict::fallback(PolicyDecision::Allow, "Low risk, auto-approved")
        } else {
            PolicyVerdict::fallback(PolicyDecision::Warn, format!("Medium risk level {risk}"))
        };
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests;
