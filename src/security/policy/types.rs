use serde::{Deserialize, Serialize};

/// Non-fatal policy outcomes. Denial is not representable here; it travels
/// as [`crate::error::PolicyDenied`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Warn,
    RequireApproval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub decision: PolicyDecision,
    pub reason: String,
    /// `None` when the numeric thresholds decided.
    pub rule_id: Option<String>,
}

impl PolicyVerdict {
    pub(super) fn fallback(decision: PolicyDecision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            rule_id: None,
        }
    }
}
