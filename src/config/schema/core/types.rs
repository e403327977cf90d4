use super::super::{AgentConfig, BudgetConfig, ModelsConfig, PolicyConfig, SchedulerConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Path to the `SQLite` database - computed from home, not serialized
    #[serde(skip)]
    pub database_path: PathBuf,

    pub openrouter_api_key: Option<String>,
    pub groq_api_key: Option<String>,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

impl Default for Config {
    fn default() -> Self {
        let forgeclaw_dir = default_forgeclaw_dir();
        Self {
            workspace_dir: forgeclaw_dir.join("workspace"),
            config_path: forgeclaw_dir.join("config.toml"),
            database_path: forgeclaw_dir.join("forgeclaw.db"),
            openrouter_api_key: None,
            groq_api_key: None,
            models: ModelsConfig::default(),
            budget: BudgetConfig::default(),
            policy: PolicyConfig::default(),
            scheduler: SchedulerConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl Config {
    /// Clamp tunables into their supported ranges, then reject settings that
    /// cannot be clamped into something meaningful.
    pub fn validate(&mut self) -> Result<()> {
        self.scheduler.clamp_limits();
        self.budget.validate()?;
        self.policy.validate()?;
        self.models.validate()?;
        Ok(())
    }
}

fn default_forgeclaw_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".forgeclaw"),
        |dirs| dirs.home_dir().join(".forgeclaw"),
    )
}
