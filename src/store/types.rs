use crate::error::StoreError;
use crate::security::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! db_enum {
    ($ty:ident, $column:literal) => {
        impl $ty {
            pub fn as_db(self) -> &'static str {
                self.into()
            }

            pub fn from_db(value: &str) -> Result<Self, StoreError> {
                value.parse().map_err(|_| StoreError::Decode {
                    column: $column,
                    value: value.to_string(),
                })
            }
        }
    };
}

// ── Tasks ───────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Planning,
    Executing,
    Paused,
    Completed,
    Failed,
}

db_enum!(TaskStatus, "tasks.status");

impl TaskStatus {
    /// Statuses that count against `max_open_tasks`.
    pub const OPEN: [Self; 3] = [Self::Planning, Self::Executing, Self::Paused];

    /// Statuses a task may hold immediately before moving to `self`.
    pub fn predecessors(self) -> &'static [Self] {
        match self {
            Self::Planning => &[],
            Self::Executing => &[Self::Planning, Self::Paused],
            Self::Paused | Self::Completed | Self::Failed => &[Self::Executing],
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        next.predecessors().contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub goal: String,
    pub status: TaskStatus,
    pub plan: Vec<String>,
    pub result_summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ── Approvals ───────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

db_enum!(ApprovalStatus, "approvals.status");

/// The blocked tool call an approval stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub tool: String,
    pub args: Map<String, Value>,
    pub risk_level: RiskLevel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub status: ApprovalStatus,
    pub request: ApprovalRequest,
    pub requested_at: String,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
}

// ── Timeline ────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimelineEventType {
    Message,
    ToolCall,
    ToolResult,
    PlanCreated,
    PlanStep,
    Approval,
    Error,
    System,
}

db_enum!(TimelineEventType, "timeline_events.type");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: TimelineEventType,
    pub summary: String,
    pub payload: Value,
}

// ── Memories ────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryKind {
    #[default]
    Fact,
    Preference,
    Project,
    Decision,
    Learning,
    Contact,
    Skill,
}

db_enum!(MemoryKind, "memories.type");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    pub text: String,
    pub tags: Vec<String>,
    /// 0..=10
    pub importance: u8,
    pub source: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMemory {
    pub kind: MemoryKind,
    pub text: String,
    pub tags: Vec<String>,
    pub importance: u8,
    pub source: Option<String>,
}

impl NewMemory {
    pub fn new(kind: MemoryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            tags: Vec::new(),
            importance: 5,
            source: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance.min(10);
        self
    }
}

// ── Cost ledger ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_cents: f64,
}

// ── Calendar ────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CalendarStatus {
    #[default]
    Scheduled,
    Done,
    Cancelled,
}

db_enum!(CalendarStatus, "calendar_events.status");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub starts_at: String,
    pub ends_at: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: CalendarStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for [`crate::store::Store::upsert_calendar_event`]; a missing id
/// creates a new event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalendarEventInput {
    pub id: Option<String>,
    pub title: String,
    pub starts_at: String,
    pub ends_at: Option<String>,
    pub event_type: Option<String>,
    pub status: CalendarStatus,
    pub notes: Option<String>,
}

// ── Stats ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub memories: i64,
    pub timeline_events: i64,
    pub approvals_pending: i64,
    pub approvals_total: i64,
    pub tasks_planning: i64,
    pub tasks_executing: i64,
    pub tasks_paused: i64,
    pub tasks_completed: i64,
    pub tasks_failed: i64,
    pub cost_today_cents: f64,
}

impl SystemStats {
    pub fn tasks_open(&self) -> i64 {
        self.tasks_planning + self.tasks_executing + self.tasks_paused
    }
}
