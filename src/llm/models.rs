use crate::config::ModelsConfig;
use serde::{Deserialize, Serialize};

/// Coarse request category; each maps to one configured model.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskClass {
    #[default]
    Default,
    Reasoning,
    Fast,
    Coding,
    Vision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    OpenRouter,
    Groq,
}

/// Static facts about one model. Rates are cents per 1000 tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub id: &'static str,
    pub provider: ProviderKind,
    pub max_tokens: u32,
    pub cost_per_1k_input: f64,
    pub cost_per_1k_output: f64,
    pub supports_tools: bool,
    pub supports_vision: bool,
}

impl ModelProfile {
    /// Cost in cents for the given token counts.
    pub fn cost_cents(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (input, output) = (input_tokens as f64, output_tokens as f64);
        input / 1000.0 * self.cost_per_1k_input + output / 1000.0 * self.cost_per_1k_output
    }

    /// Model id as the provider's API expects it.
    pub fn api_model_id(&self) -> &'static str {
        match self.provider {
            ProviderKind::Groq => self.id.strip_prefix("groq/").unwrap_or(self.id),
            ProviderKind::OpenRouter => self.id,
        }
    }
}

const fn profile(
    id: &'static str,
    provider: ProviderKind,
    max_tokens: u32,
    cost_per_1k_input: f64,
    cost_per_1k_output: f64,
    supports_tools: bool,
    supports_vision: bool,
) -> ModelProfile {
    ModelProfile {
        id,
        provider,
        max_tokens,
        cost_per_1k_input,
        cost_per_1k_output,
        supports_tools,
        supports_vision,
    }
}

static CATALOG: &[ModelProfile] = &[
    profile("qwen/qwen3-next-80b-a3b-instruct:free", ProviderKind::OpenRouter, 8192, 0.0, 0.0, true, false),
    profile("qwen/qwen3-coder:free", ProviderKind::OpenRouter, 8192, 0.0, 0.0, true, false),
    profile("z-ai/glm-4.5-air:free", ProviderKind::OpenRouter, 8192, 0.0, 0.0, true, false),
    profile("openrouter/free", ProviderKind::OpenRouter, 8192, 0.0, 0.0, true, false),
    profile("anthropic/claude-sonnet-4-20250514", ProviderKind::OpenRouter, 64000, 0.3, 1.5, true, true),
    profile("anthropic/claude-opus-4-0-20250115", ProviderKind::OpenRouter, 32000, 1.5, 7.5, true, true),
    profile("groq/llama-3.3-70b-versatile", ProviderKind::Groq, 32000, 0.059, 0.079, true, false),
    profile("google/gemini-2.0-flash", ProviderKind::OpenRouter, 65000, 0.01, 0.04, true, true),
    profile("deepseek/deepseek-r1", ProviderKind::OpenRouter, 64000, 0.055, 0.22, false, false),
];

pub fn lookup_profile(id: &str) -> Option<&'static ModelProfile> {
    CATALOG.iter().find(|p| p.id == id)
}

/// Pure mapping from [`TaskClass`] to a catalogued model.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    default: &'static ModelProfile,
    reasoning: &'static ModelProfile,
    fast: &'static ModelProfile,
    coding: &'static ModelProfile,
    vision: &'static ModelProfile,
}

impl ModelSelector {
    /// Unknown ids fall back to the default class's profile; an unknown
    /// default falls back to the first catalog entry.
    pub fn new(config: &ModelsConfig) -> Self {
        let resolve = |class: TaskClass, id: &str, fallback: &'static ModelProfile| {
            lookup_profile(id).unwrap_or_else(|| {
                tracing::warn!(
                    task = %class,
                    model = id,
                    fallback = fallback.id,
                    "model not in catalog; using default"
                );
                fallback
            })
        };
        let default = resolve(TaskClass::Default, &config.default, &CATALOG[0]);
        Self {
            default,
            reasoning: resolve(TaskClass::Reasoning, &config.reasoning, default),
            fast: resolve(TaskClass::Fast, &config.fast, default),
            coding: resolve(TaskClass::Coding, &config.coding, default),
            vision: resolve(TaskClass::Vision, &config.vision, default),
        }
    }

    pub fn select(&self, task: TaskClass) -> &'static ModelProfile {
        match task {
            TaskClass::Default => self.default,
            TaskClass::Reasoning => self.reasoning,
            TaskClass::Fast => self.fast,
            TaskClass::Coding => self.coding,
            TaskClass::Vision => self.vision,
        }
    }
}
