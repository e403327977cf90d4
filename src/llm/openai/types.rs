//! Chat-completions wire shapes. Requests borrow from the caller; responses
//! keep only the fields the router reads.

use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct CompletionRequest<'a> {
    pub(super) model: &'a str,
    pub(super) messages: Vec<WireMessage<'a>>,
    pub(super) temperature: f64,
    pub(super) max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) tools: Option<Vec<WireTool<'a>>>,
}

#[derive(Debug, Serialize)]
pub(super) struct WireMessage<'a> {
    pub(super) role: &'static str,
    pub(super) content: &'a str,
}

/// `{"type": "function", "function": {name, description, parameters}}`
#[derive(Debug, Serialize)]
pub(super) struct WireTool<'a> {
    #[serde(rename = "type")]
    pub(super) kind: &'static str,
    pub(super) function: &'a ToolSpec,
}

impl<'a> From<&'a ToolSpec> for WireTool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        Self {
            kind: "function",
            function: spec,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CompletionResponse {
    #[serde(default)]
    pub(super) choices: Vec<CompletionChoice>,
    pub(super) usage: Option<TokenCounts>,
    pub(super) model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenCounts {
    #[serde(default)]
    pub(super) prompt_tokens: u64,
    #[serde(default)]
    pub(super) completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct CompletionChoice {
    pub(super) message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct AssistantMessage {
    pub(super) content: Option<String>,
    /// Some providers send an explicit `null`.
    pub(super) tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireToolCall {
    #[serde(default)]
    pub(super) id: String,
    pub(super) function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireFunctionCall {
    pub(super) name: String,
    /// Raw JSON text; parsed by the orchestrator.
    #[serde(default)]
    pub(super) arguments: String,
}
