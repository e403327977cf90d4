pub mod schema;

pub use schema::{
    AgentConfig, BudgetConfig, Config, ModelsConfig, PolicyConfig, PolicyRuleConfig,
    RiskThresholds, RuleAction, SchedulerConfig, TrackConfig, default_rules, default_tracks,
};
