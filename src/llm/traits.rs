use super::types::{ChatMessage, ProviderResponse};
use crate::tools::ToolSpec;
use std::future::Future;
use std::pin::Pin;

/// Everything a provider needs for one completion. The router has already
/// picked the model, clamped `max_tokens`, and dropped tools the model
/// cannot take.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub model: &'a str,
    pub system_prompt: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub tools: Option<&'a [ToolSpec]>,
    pub temperature: f64,
    pub max_tokens: u32,
}

pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "openrouter", "groq").
    fn name(&self) -> &str;

    /// One chat completion. Non-2xx responses are errors whose text carries
    /// the response body.
    fn chat<'a>(
        &'a self,
        request: ProviderRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>>;
}
