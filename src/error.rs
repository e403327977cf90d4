use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `forgeclaw`.
///
/// Only conditions a caller must branch on get a typed variant. Tool failures
/// and malformed tool-call arguments never appear here: they are converted to
/// data at their component boundary.
#[derive(Debug, Error)]
pub enum ForgeError {
    // ── Policy ──────────────────────────────────────────────────────────
    #[error(transparent)]
    PolicyDenied(#[from] PolicyDenied),

    // ── Budget ──────────────────────────────────────────────────────────
    #[error(transparent)]
    CostLimit(#[from] CostLimitExceeded),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Store ───────────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ForgeError {
    /// Whether this error ends the current budget period or policy decision
    /// for good (as opposed to a transient provider or I/O problem).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PolicyDenied(_) | Self::CostLimit(_))
    }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// A deny rule matched. The call must not execute.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Policy denied: {tool} - {reason}")]
pub struct PolicyDenied {
    pub tool: String,
    pub reason: String,
    pub rule_id: Option<String>,
}

// ─── Budget ──────────────────────────────────────────────────────────────────

/// Today's recorded spend has reached the configured ceiling.
#[derive(Debug, Clone, Error, PartialEq)]
#[error(
    "Daily cost limit reached: ${:.2} / ${:.2}",
    .spent_cents / 100.0,
    .limit_cents / 100.0
)]
pub struct CostLimitExceeded {
    pub spent_cents: f64,
    pub limit_cents: f64,
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("no provider configured for {provider}")]
    ProviderMissing { provider: String },
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("unrecognized {column} value in database: {value}")]
    Decode { column: &'static str, value: String },

    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid policy rule {rule}: {message}")]
    InvalidRule { rule: String, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for typed results.
pub type ForgeResult<T> = Result<T, ForgeError>;
