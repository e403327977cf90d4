mod agent;
mod core;
mod models;
mod policy;
mod scheduler;

pub use agent::AgentConfig;
pub use self::core::Config;
pub use models::{BudgetConfig, ModelsConfig};
pub use policy::{PolicyConfig, PolicyRuleConfig, RiskThresholds, RuleAction, default_rules};
pub use scheduler::{SchedulerConfig, TrackConfig, default_tracks};
