mod types;

use self::types::{CompletionRequest, CompletionResponse, WireMessage, WireTool};
use super::traits::{Provider, ProviderRequest};
use super::types::{MessageRole, ProviderResponse, ToolCall, Usage};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const OPENROUTER_CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENROUTER_EXTRA_HEADERS: &[(&str, &str)] = &[("X-Title", "forgeclaw")];

pub fn build_provider_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Any backend speaking the OpenAI chat-completions wire format.
pub struct OpenAiCompatibleProvider {
    name: &'static str,
    url: String,
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    extra_headers: &'static [(&'static str, &'static str)],
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn openrouter(api_key: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            name: "openrouter",
            url: OPENROUTER_CHAT_COMPLETIONS_URL.to_string(),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            extra_headers: OPENROUTER_EXTRA_HEADERS,
            client: build_provider_client(timeout_secs),
        }
    }

    pub fn groq(api_key: Option<&str>, timeout_secs: u64) -> Self {
        Self {
            name: "groq",
            url: GROQ_CHAT_COMPLETIONS_URL.to_string(),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            extra_headers: &[],
            client: build_provider_client(timeout_secs),
        }
    }

    /// Point the provider at a different endpoint (local proxies, tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn call_api(&self, request: &CompletionRequest<'_>) -> anyhow::Result<CompletionResponse> {
        let auth_header = self.cached_auth_header.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Set it in config.toml or the environment.",
                self.name
            )
        })?;

        let mut request_builder = self
            .client
            .post(&self.url)
            .header("Authorization", auth_header)
            .json(request);
        for (name, value) in self.extra_headers {
            request_builder = request_builder.header(*name, *value);
        }

        let response = request_builder
            .send()
            .await
            .map_err(|error| anyhow::anyhow!("{} request failed: {error}", self.name))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} API error ({status}): {body}", self.name);
        }

        response
            .json()
            .await
            .map_err(|error| anyhow::anyhow!("{} response JSON decode failed: {error}", self.name))
    }
}

fn map_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant | MessageRole::Tool => "assistant",
    }
}

fn build_request<'a>(request: &ProviderRequest<'a>) -> CompletionRequest<'a> {
    let system = request.system_prompt.map(|content| WireMessage {
        role: "system",
        content,
    });
    let messages = system
        .into_iter()
        .chain(request.messages.iter().map(|msg| WireMessage {
            role: map_role(msg.role),
            content: &msg.content,
        }))
        .collect();

    CompletionRequest {
        model: request.model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools: request
            .tools
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(WireTool::from).collect()),
    }
}

fn into_provider_response(name: &str, chat: CompletionResponse) -> anyhow::Result<ProviderResponse> {
    let choice = chat
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No response from {name}"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    Ok(ProviderResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage: chat.usage.map_or_else(Usage::default, |counts| Usage {
            input_tokens: counts.prompt_tokens,
            output_tokens: counts.completion_tokens,
        }),
        model: chat.model,
    })
}

impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn chat<'a>(
        &'a self,
        request: ProviderRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let body = build_request(&request);
            let chat = self.call_api(&body).await?;
            into_provider_response(self.name, chat)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use crate::tools::ToolSpec;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request<'a>(
        messages: &'a [ChatMessage],
        tools: Option<&'a [ToolSpec]>,
    ) -> ProviderRequest<'a> {
        ProviderRequest {
            model: "test/model",
            system_prompt: Some("be brief"),
            messages,
            tools,
            temperature: 0.7,
            max_tokens: 512,
        }
    }

    #[test]
    fn tool_messages_are_sent_as_assistant_text() {
        let messages = vec![ChatMessage::user("hi"), ChatMessage::tool("Tool x result: ok")];
        let body = build_request(&request(&messages, None));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][2]["role"], "assistant");
        assert!(value.get("tools").is_none());
        assert_eq!(value["max_tokens"], 512);
    }

    #[tokio::test]
    async fn parses_tool_calls_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "test/model",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "filesystem", "arguments": "{\"action\":\"list\",\"path\":\".\"}"}
                        }]
                    }
                }],
                "usage": {"prompt_tokens": 120, "completion_tokens": 30}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::openrouter(Some("sk-test"), 5)
            .with_url(format!("{}/v1/chat/completions", server.uri()));
        let messages = vec![ChatMessage::user("list files")];
        let response = provider.chat(request(&messages, None)).await.unwrap();

        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "filesystem");
        assert_eq!(response.usage.input_tokens, 120);
        assert_eq!(response.usage.output_tokens, 30);
        assert_eq!(response.content, "");
    }

    #[tokio::test]
    async fn error_status_surfaces_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string("tool call validation failed: bad schema"),
            )
            .mount(&server)
            .await;

        let provider =
            OpenAiCompatibleProvider::groq(Some("gsk"), 5).with_url(server.uri());
        let messages = vec![ChatMessage::user("x")];
        let err = provider.chat(request(&messages, None)).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("groq API error"));
        assert!(text.contains("tool call validation failed"));
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let provider = OpenAiCompatibleProvider::openrouter(None, 5)
            .with_url("http://127.0.0.1:9/unreachable");
        let messages = vec![ChatMessage::user("x")];
        let err = provider.chat(request(&messages, None)).await.unwrap_err();
        assert!(err.to_string().contains("API key not set"));
    }
}
