// ── Contracts ───────────────────────────────────────────────────────────────
pub mod traits;
pub mod types;

// ── Routing ─────────────────────────────────────────────────────────────────
pub mod budget;
pub mod models;
pub mod router;

// ── Provider implementations ────────────────────────────────────────────────
pub mod openai;

pub use budget::{BudgetTracker, DayClock};
pub use models::{ModelProfile, ModelSelector, ProviderKind, TaskClass, lookup_profile};
pub use openai::{OpenAiCompatibleProvider, build_provider_client};
pub use router::{ChatOptions, ModelRouter};
pub use traits::{Provider, ProviderRequest};
pub use types::{ChatMessage, ChatResponse, MessageRole, ProviderResponse, ToolCall, Usage};
