#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forgeclaw::agent::Orchestrator;
use forgeclaw::config::Config;
use forgeclaw::llm::{BudgetTracker, ModelRouter, OpenAiCompatibleProvider, ProviderKind};
use forgeclaw::security::PolicyEngine;
use forgeclaw::skills::SkillRegistry;
use forgeclaw::store::Store;
use forgeclaw::tools::default_registry;

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// An orchestrator with the shipped tools, a temp workspace and both
/// providers pointed at a local mock completions endpoint.
pub struct AgentHarness {
    pub server: MockServer,
    pub store: Store,
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    _tmp: TempDir,
}

impl AgentHarness {
    pub async fn start() -> Self {
        let tmp = TempDir::new().unwrap();
        let workspace = tmp.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        let config = Config {
            workspace_dir: workspace,
            database_path: tmp.path().join("forgeclaw.db"),
            ..Config::default()
        };

        let server = MockServer::start().await;
        let store = Store::open(&config.database_path).await.unwrap();
        let budget = Arc::new(BudgetTracker::new(store.clone(), &config.budget).await.unwrap());
        let url = format!("{}{COMPLETIONS_PATH}", server.uri());
        let router = ModelRouter::new(&config.models, budget)
            .with_provider(
                ProviderKind::OpenRouter,
                Arc::new(OpenAiCompatibleProvider::openrouter(Some("sk-test"), 5).with_url(&url)),
            )
            .with_provider(
                ProviderKind::Groq,
                Arc::new(OpenAiCompatibleProvider::groq(Some("gsk-test"), 5).with_url(&url)),
            );

        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(router),
            Arc::new(default_registry(&config, &store)),
            PolicyEngine::new(&config.policy).unwrap(),
            SkillRegistry::default(),
            config.agent.clone(),
        );

        Self {
            server,
            store,
            config,
            orchestrator: Arc::new(orchestrator),
            _tmp: tmp,
        }
    }

    pub fn workspace(&self) -> &std::path::Path {
        &self.config.workspace_dir
    }

    /// Queue one completion; queued replies are served in mount order.
    pub async fn reply(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }
}

pub fn text_completion(content: &str) -> Value {
    json!({
        "model": "mock/model",
        "choices": [{"message": {"content": content}}],
        "usage": {"prompt_tokens": 100, "completion_tokens": 20}
    })
}

pub fn tool_completion(name: &str, arguments: &Value) -> Value {
    json!({
        "model": "mock/model",
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": name, "arguments": arguments.to_string()}
                }]
            }
        }],
        "usage": {"prompt_tokens": 150, "completion_tokens": 30}
    })
}
