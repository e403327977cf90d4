use super::traits::Tool;
use super::types::{ParamKind, ToolArgs, ToolParameter, ToolResult};
use crate::security::RiskLevel;
use crate::store::{MemoryKind, NewMemory, Store};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Lets the agent write to and query its long-term memory.
pub struct MemoryTool {
    store: Store,
}

impl MemoryTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn store_memory(&self, args: &ToolArgs) -> anyhow::Result<ToolResult> {
        let Some(text) = args.get("text").and_then(Value::as_str).map(str::trim) else {
            return Ok(ToolResult::failed("text is required for store"));
        };
        if text.is_empty() {
            return Ok(ToolResult::failed("text is required for store"));
        }

        let kind = match args.get("type").and_then(Value::as_str) {
            Some(raw) => match MemoryKind::from_db(raw) {
                Ok(kind) => kind,
                Err(_) => return Ok(ToolResult::failed(format!("Unknown memory type: {raw}"))),
            },
            None => MemoryKind::Fact,
        };
        let tags = args
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let importance = args
            .get("importance")
            .and_then(Value::as_u64)
            .map_or(5, |v| v.min(10) as u8);

        let mut memory = NewMemory::new(kind, text)
            .with_tags(tags)
            .with_importance(importance);
        memory.source = Some("agent".into());

        let stored = self.store.add_memory(&memory).await?;
        Ok(ToolResult::ok(format!("Stored memory {}", stored.id)))
    }

    async fn search(&self, args: &ToolArgs) -> anyhow::Result<ToolResult> {
        let query = args.get("text").and_then(Value::as_str).unwrap_or_default();
        #[allow(clippy::cast_possible_truncation)]
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SEARCH_LIMIT, |v| v.clamp(1, 50) as usize);

        let found = self.store.search_memories(query, limit).await?;
        if found.is_empty() {
            return Ok(ToolResult::ok("No matching memories."));
        }
        let lines: Vec<String> = found
            .iter()
            .map(|m| format!("- [{}] {}", m.kind, m.text))
            .collect();
        Ok(ToolResult::ok(lines.join("\n")))
    }
}

impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "memory"
    }

    fn description(&self) -> &str {
        "Store a durable memory or search stored memories"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required("action", ParamKind::String, "One of: store, search"),
            ToolParameter::required(
                "text",
                ParamKind::String,
                "Memory text to store, or the search query",
            ),
            ToolParameter::optional(
                "type",
                ParamKind::String,
                "fact, preference, project, decision, learning, contact or skill",
            ),
            ToolParameter::optional("tags", ParamKind::Array, "Tags for a stored memory"),
            ToolParameter::optional("importance", ParamKind::Integer, "0-10, default 5"),
            ToolParameter::optional("limit", ParamKind::Integer, "Maximum search results"),
        ]
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::None
    }

    fn execute<'a>(
        &'a self,
        args: &'a ToolArgs,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(async move {
            match args.get("action").and_then(Value::as_str) {
                Some("store") => self.store_memory(args).await,
                Some("search") => self.search(args).await,
                Some(other) => Ok(ToolResult::failed(format!("Unknown action: {other}"))),
                None => anyhow::bail!("Missing 'action' parameter"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn store_then_search() {
        let store = Store::in_memory().await.unwrap();
        let tool = MemoryTool::new(store.clone());

        let stored = tool
            .execute(&args(json!({
                "action": "store",
                "text": "Customer prefers weekly invoices",
                "type": "preference",
                "tags": ["billing"],
                "importance": 7
            })))
            .await
            .unwrap();
        assert!(stored.success);

        let found = tool
            .execute(&args(json!({"action": "search", "text": "invoices"})))
            .await
            .unwrap();
        assert_eq!(found.output, "- [preference] Customer prefers weekly invoices");

        let memories = store.search_memories("weekly", 5).await.unwrap();
        assert_eq!(memories[0].importance, 7);
        assert_eq!(memories[0].source.as_deref(), Some("agent"));
    }

    #[tokio::test]
    async fn unknown_type_is_a_failed_result() {
        let store = Store::in_memory().await.unwrap();
        let tool = MemoryTool::new(store);
        let result = tool
            .execute(&args(json!({"action": "store", "text": "x", "type": "rumor"})))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown memory type: rumor"));
    }
}
