use super::*;
use crate::config::BudgetConfig;
use crate::llm::types::ProviderResponse;
use crate::store::Store;
use crate::tools::ToolSpec;
use serde_json::json;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct SeenRequest {
    model: String,
    system_prompt: Option<String>,
    tool_count: Option<usize>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Default)]
struct ScriptedProvider {
    replies: Mutex<VecDeque<anyhow::Result<ProviderResponse>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<anyhow::Result<ProviderResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn chat<'a>(
        &'a self,
        request: ProviderRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(SeenRequest {
                model: request.model.to_string(),
                system_prompt: request.system_prompt.map(str::to_string),
                tool_count: request.tools.map(<[ToolSpec]>::len),
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ProviderResponse::text("default reply")))
        })
    }
}

fn specs() -> Vec<ToolSpec> {
    vec![ToolSpec {
        name: "filesystem".into(),
        description: "files".into(),
        parameters: json!({"type": "object", "properties": {}, "required": []}),
    }]
}

async fn router_with(
    models: ModelsConfig,
    dollars: f64,
    provider: Arc<ScriptedProvider>,
) -> ModelRouter {
    let store = Store::in_memory().await.unwrap();
    let budget = BudgetTracker::new(
        store,
        &BudgetConfig {
            max_cost_per_day: dollars,
            ..BudgetConfig::default()
        },
    )
    .await
    .unwrap();
    ModelRouter::new(&models, Arc::new(budget))
        .with_provider(ProviderKind::OpenRouter, provider.clone())
        .with_provider(ProviderKind::Groq, provider)
}

#[tokio::test]
async fn shapes_request_from_profile_and_defaults() {
    let provider = ScriptedProvider::new(vec![Ok(ProviderResponse::text("hi"))]);
    let router = router_with(ModelsConfig::default(), 25.0, provider.clone()).await;
    let tools = specs();

    let response = router
        .chat(
            &[ChatMessage::user("hello")],
            ChatOptions {
                tools: Some(&tools),
                system_prompt: Some("sys"),
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(response.content, "hi");
    assert_eq!(response.model, "qwen/qwen3-next-80b-a3b-instruct:free");
    let seen = provider.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].max_tokens, 4096);
    assert!((seen[0].temperature - 0.7).abs() < f64::EPSILON);
    assert_eq!(seen[0].tool_count, Some(1));
    assert_eq!(seen[0].system_prompt.as_deref(), Some("sys"));
}

#[tokio::test]
async fn requested_max_tokens_is_clamped_from_below() {
    let provider = ScriptedProvider::new(vec![]);
    let router = router_with(ModelsConfig::default(), 25.0, provider.clone()).await;
    router
        .chat(
            &[ChatMessage::user("x")],
            ChatOptions {
                max_tokens: Some(10),
                temperature: Some(0.1),
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap();
    let seen = provider.seen();
    assert_eq!(seen[0].max_tokens, 256);
    assert!((seen[0].temperature - 0.1).abs() < f64::EPSILON);
}

#[tokio::test]
async fn tool_call_failure_retries_once_without_tools() {
    let provider = ScriptedProvider::new(vec![
        Err(anyhow::anyhow!(
            "openrouter API error (400): Tool call validation failed: bad args"
        )),
        Ok(ProviderResponse::text("plain answer")),
    ]);
    let router = router_with(ModelsConfig::default(), 25.0, provider.clone()).await;
    let tools = specs();

    let response = router
        .chat(
            &[ChatMessage::user("hello")],
            ChatOptions {
                tools: Some(&tools),
                system_prompt: Some("base prompt"),
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(response.content, "plain answer");
    let seen = provider.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].tool_count, None);
    assert_eq!(seen[1].model, seen[0].model);
    assert_eq!(
        seen[1].system_prompt.as_deref(),
        Some(
            "base prompt\n\nTool calling is unavailable for this request. Reply directly without using tools."
        )
    );
}

#[tokio::test]
async fn generic_failure_falls_back_to_fast_model_once() {
    let provider = ScriptedProvider::new(vec![
        Err(anyhow::anyhow!("openrouter API error (503): overloaded")),
        Ok(ProviderResponse::text("fast answer")),
    ]);
    let router = router_with(ModelsConfig::default(), 25.0, provider.clone()).await;

    let response = router
        .chat(&[ChatMessage::user("x")], ChatOptions::default())
        .await
        .unwrap();
    assert_eq!(response.model, "z-ai/glm-4.5-air:free");
    assert_eq!(provider.seen().len(), 2);
}

#[tokio::test]
async fn each_retry_kind_is_used_at_most_once() {
    let provider = ScriptedProvider::new(vec![
        Err(anyhow::anyhow!("failed to call a function")),
        Err(anyhow::anyhow!("failed to call a function")),
        Err(anyhow::anyhow!("failed to call a function")),
        Ok(ProviderResponse::text("never reached")),
    ]);
    let router = router_with(ModelsConfig::default(), 25.0, provider.clone()).await;
    let tools = specs();

    let err = router
        .chat(
            &[ChatMessage::user("x")],
            ChatOptions {
                tools: Some(&tools),
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ForgeError::Llm(LlmError::Request { .. })));
    assert_eq!(provider.seen().len(), 3);
}

#[tokio::test]
async fn fast_class_failure_propagates_without_retry() {
    let provider = ScriptedProvider::new(vec![Err(anyhow::anyhow!("boom"))]);
    let router = router_with(ModelsConfig::default(), 25.0, provider.clone()).await;

    let err = router
        .chat(
            &[ChatMessage::user("x")],
            ChatOptions {
                task: TaskClass::Fast,
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("boom"));
    assert_eq!(provider.seen().len(), 1);
}

#[tokio::test]
async fn budget_refusal_never_reaches_provider() {
    let provider = ScriptedProvider::new(vec![Ok(
        ProviderResponse::text("pricey").with_usage(100_000, 100_000)
    )]);
    let models = ModelsConfig {
        default: "anthropic/claude-opus-4-0-20250115".into(),
        ..ModelsConfig::default()
    };
    let router = router_with(models, 1.0, provider.clone()).await;

    router
        .chat(&[ChatMessage::user("x")], ChatOptions::default())
        .await
        .unwrap();
    assert!(router.budget().spent_today() >= 100.0);

    let err = router
        .chat(&[ChatMessage::user("again")], ChatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::CostLimit(_)));
    assert!(err.is_fatal());
    assert_eq!(provider.seen().len(), 1);
}

#[tokio::test]
async fn models_without_tool_support_get_no_tools() {
    let provider = ScriptedProvider::new(vec![]);
    let models = ModelsConfig {
        reasoning: "deepseek/deepseek-r1".into(),
        ..ModelsConfig::default()
    };
    let router = router_with(models, 25.0, provider.clone()).await;
    let tools = specs();

    router
        .chat(
            &[ChatMessage::user("x")],
            ChatOptions {
                task: TaskClass::Reasoning,
                tools: Some(&tools),
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(provider.seen()[0].tool_count, None);
}

#[tokio::test]
async fn groq_models_are_sent_without_prefix() {
    let provider = ScriptedProvider::new(vec![]);
    let models = ModelsConfig {
        coding: "groq/llama-3.3-70b-versatile".into(),
        ..ModelsConfig::default()
    };
    let router = router_with(models, 25.0, provider.clone()).await;

    let response = router
        .chat(
            &[ChatMessage::user("x")],
            ChatOptions {
                task: TaskClass::Coding,
                ..ChatOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(provider.seen()[0].model, "llama-3.3-70b-versatile");
    assert_eq!(response.model, "llama-3.3-70b-versatile");
}
