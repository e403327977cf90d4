use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Per-task-class model identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_general_model")]
    pub default: String,
    #[serde(default = "default_general_model")]
    pub reasoning: String,
    #[serde(default = "default_fast_model")]
    pub fast: String,
    #[serde(default = "default_coding_model")]
    pub coding: String,
    #[serde(default = "default_general_model")]
    pub vision: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Upper bound applied to every request's `max_tokens`.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

pub(crate) fn default_general_model() -> String {
    "qwen/qwen3-next-80b-a3b-instruct:free".into()
}

pub(crate) fn default_fast_model() -> String {
    "z-ai/glm-4.5-air:free".into()
}

pub(crate) fn default_coding_model() -> String {
    "qwen/qwen3-coder:free".into()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: default_general_model(),
            reasoning: default_general_model(),
            fast: default_fast_model(),
            coding: default_coding_model(),
            vision: default_general_model(),
            default_temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ModelsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            anyhow::bail!("models.default_temperature must be in [0.0, 2.0]");
        }
        if self.max_output_tokens < 256 {
            anyhow::bail!("models.max_output_tokens must be >= 256");
        }
        Ok(())
    }
}

/// Daily spend ceiling for model calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Ceiling in dollars per calendar day (UTC).
    #[serde(default = "default_max_cost_per_day")]
    pub max_cost_per_day: f64,
    /// Log a warning once the remaining budget drops below this many cents.
    #[serde(default = "default_warn_below_cents")]
    pub warn_below_cents: f64,
}

fn default_max_cost_per_day() -> f64 {
    25.0
}

fn default_warn_below_cents() -> f64 {
    100.0
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_cost_per_day: default_max_cost_per_day(),
            warn_below_cents: default_warn_below_cents(),
        }
    }
}

impl BudgetConfig {
    pub fn limit_cents(&self) -> f64 {
        self.max_cost_per_day * 100.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cost_per_day.is_nan() || self.max_cost_per_day <= 0.0 {
            anyhow::bail!("budget.max_cost_per_day must be > 0");
        }
        if self.warn_below_cents.is_nan() || self.warn_below_cents < 0.0 {
            anyhow::bail!("budget.warn_below_cents must be >= 0");
        }
        Ok(())
    }
}
