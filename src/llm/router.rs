use super::budget::BudgetTracker;
use super::models::{ModelProfile, ModelSelector, ProviderKind, TaskClass};
use super::openai::OpenAiCompatibleProvider;
use super::traits::{Provider, ProviderRequest};
use super::types::{ChatMessage, ChatResponse};
use crate::config::{Config, ModelsConfig};
use crate::error::{ForgeError, LlmError};
use crate::tools::ToolSpec;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

const MIN_OUTPUT_TOKENS: u32 = 256;
const TOOLS_UNAVAILABLE_NOTE: &str =
    "Tool calling is unavailable for this request. Reply directly without using tools.";

/// Provider errors that mean the model mishandled function calling rather
/// than the request failing outright.
static TOOL_CALL_FAILURE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)failed to call a function|tool call validation failed|not in request\.tools|was not in request\.tools|invalid json schema",
    )
    .ok()
});

fn is_tool_call_failure(message: &str) -> bool {
    TOOL_CALL_FAILURE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(message))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions<'a> {
    pub task: TaskClass,
    pub tools: Option<&'a [ToolSpec]>,
    pub system_prompt: Option<&'a str>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Picks a model per task class, enforces the daily budget and retries at
/// most once without tools and at most once on the fast model.
pub struct ModelRouter {
    selector: ModelSelector,
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    budget: Arc<BudgetTracker>,
    default_temperature: f64,
    max_output_tokens: u32,
}

impl ModelRouter {
    pub fn new(config: &ModelsConfig, budget: Arc<BudgetTracker>) -> Self {
        Self {
            selector: ModelSelector::new(config),
            providers: HashMap::new(),
            budget,
            default_temperature: config.default_temperature,
            max_output_tokens: config.max_output_tokens.max(MIN_OUTPUT_TOKENS),
        }
    }

    /// Router wired to the OpenRouter and Groq endpoints.
    pub fn from_config(config: &Config, budget: Arc<BudgetTracker>) -> Self {
        let timeout = config.models.request_timeout_secs;
        Self::new(&config.models, budget)
            .with_provider(
                ProviderKind::OpenRouter,
                Arc::new(OpenAiCompatibleProvider::openrouter(
                    config.openrouter_api_key.as_deref(),
                    timeout,
                )),
            )
            .with_provider(
                ProviderKind::Groq,
                Arc::new(OpenAiCompatibleProvider::groq(
                    config.groq_api_key.as_deref(),
                    timeout,
                )),
            )
    }

    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions<'_>,
    ) -> Result<ChatResponse, ForgeError> {
        let mut task = options.task;
        let mut tools = options.tools.filter(|t| !t.is_empty());
        let mut system_prompt = options.system_prompt.map(str::to_string);
        let mut retried_without_tools = false;
        let mut fell_back_to_fast = false;

        loop {
            self.budget.check()?;

            let profile = self.selector.select(task);
            let tools_sent = tools.filter(|_| profile.supports_tools);

            let error = match self
                .attempt(profile, messages, tools_sent, system_prompt.as_deref(), options)
                .await
            {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };
            let message = format!("{error:#}");
            tracing::error!(model = profile.id, error = %message, "LLM call failed");

            if !retried_without_tools && tools_sent.is_some() && is_tool_call_failure(&message) {
                tracing::warn!(
                    model = profile.id,
                    "tool-call generation failed; retrying without tools"
                );
                retried_without_tools = true;
                tools = None;
                let base = system_prompt.take().unwrap_or_default();
                system_prompt =
                    Some(format!("{base}\n\n{TOOLS_UNAVAILABLE_NOTE}").trim().to_string());
                continue;
            }

            let fast = self.selector.select(TaskClass::Fast);
            if !fell_back_to_fast && task != TaskClass::Fast && profile.id != fast.id {
                tracing::warn!(
                    from_model = profile.id,
                    to_model = fast.id,
                    "falling back to fast model"
                );
                fell_back_to_fast = true;
                task = TaskClass::Fast;
                continue;
            }

            return Err(LlmError::Request {
                provider: profile.provider.to_string(),
                message,
            }
            .into());
        }
    }

    async fn attempt(
        &self,
        profile: &ModelProfile,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
        system_prompt: Option<&str>,
        options: ChatOptions<'_>,
    ) -> anyhow::Result<ChatResponse> {
        let provider = self.providers.get(&profile.provider).ok_or_else(|| {
            anyhow::Error::new(LlmError::ProviderMissing {
                provider: profile.provider.to_string(),
            })
        })?;

        let max_tokens = options
            .max_tokens
            .unwrap_or(profile.max_tokens)
            .clamp(MIN_OUTPUT_TOKENS, self.max_output_tokens);
        let model = profile.api_model_id();

        let response = provider
            .chat(ProviderRequest {
                model,
                system_prompt,
                messages,
                tools,
                temperature: options.temperature.unwrap_or(self.default_temperature),
                max_tokens,
            })
            .await?;

        let cost_cents =
            profile.cost_cents(response.usage.input_tokens, response.usage.output_tokens);
        if let Err(error) = self
            .budget
            .record(
                model,
                response.usage.input_tokens,
                response.usage.output_tokens,
                cost_cents,
            )
            .await
        {
            tracing::warn!(model, error = %format!("{error:#}"), "failed to persist cost record");
        }

        tracing::info!(
            model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            cost_cents,
            "LLM call completed"
        );

        Ok(ChatResponse {
            content: response.content,
            tool_calls: response.tool_calls,
            usage: response.usage,
            model: model.to_string(),
            cost_cents,
        })
    }
}

#[cfg(test)]
mod tests;
