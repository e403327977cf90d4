use crate::store::ApprovalStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a message entered the system. Recorded on timeline events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Cli,
    Telegram,
    Dashboard,
    Scheduler,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Tool-call arguments were not valid JSON.
    Parse,
    /// A tool ran and reported failure.
    Tool,
    /// A deny rule matched.
    Denied,
    /// Daily cost ceiling reached.
    Budget,
    /// Provider, store or other unexpected error.
    Error,
}

/// Result of one conversation turn. Callers branch on the variant; `Display`
/// gives the text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answer(String),
    ApprovalRequired {
        approval_id: String,
        message: String,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl TurnOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answer(text) => f.write_str(text),
            Self::ApprovalRequired { message, .. } | Self::Failed { message, .. } => {
                f.write_str(message)
            }
        }
    }
}

/// Result of `/approve` or `/deny`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    NotFound {
        id: String,
    },
    AlreadyResolved {
        id: String,
        status: ApprovalStatus,
    },
    Denied {
        id: String,
    },
    Executed {
        tool: String,
        output: String,
    },
    ExecutionFailed {
        id: String,
        tool: String,
        reason: String,
        output: String,
    },
    ToolMissing {
        id: String,
        tool: String,
    },
}

impl fmt::Display for ApprovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "Approval ID not found: {id}"),
            Self::AlreadyResolved { id, status } => {
                write!(f, "Approval {id} is already {status}.")
            }
            Self::Denied { id } => write!(f, "Denied: {id}"),
            Self::Executed { tool, output } => {
                write!(f, "Approved and executed {tool}\n\n{output}")
            }
            Self::ExecutionFailed {
                id,
                tool,
                reason,
                output,
            } => {
                write!(
                    f,
                    "Approved {id}, but execution failed\nTool: {tool}\nReason: {reason}"
                )?;
                if !output.is_empty() {
                    write!(f, "\n\nOutput:\n{output}")?;
                }
                Ok(())
            }
            Self::ToolMissing { id, tool } => {
                write!(f, "Approved {id}, but tool `{tool}` is not registered.")
            }
        }
    }
}
