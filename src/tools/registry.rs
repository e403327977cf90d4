use super::traits::Tool;
use super::types::{ToolArgs, ToolResult, ToolSpec};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Central registry for tool instances.
///
/// Registration order is preserved so the schema projection handed to the
/// model is stable between runs.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            timeout,
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if let Some(&slot) = self.index.get(&name) {
            self.tools[slot] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Return specs for all registered tools.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    /// Run a tool. Never fails: unknown tools, missing required arguments,
    /// handler errors and timeouts all come back as a failed [`ToolResult`].
    pub async fn execute(&self, name: &str, args: &ToolArgs) -> ToolResult {
        let started = Instant::now();
        let mut result = match self.get(name) {
            None => ToolResult::failed(format!("Unknown tool: {name}")),
            Some(tool) => match missing_required(tool.as_ref(), args) {
                Some(field) => {
                    ToolResult::failed(format!("Missing required argument `{field}` for {name}"))
                }
                None => self.run_handler(tool.as_ref(), args).await,
            },
        };
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !result.success {
            tracing::debug!(
                tool = name,
                error = result.error.as_deref().unwrap_or_default(),
                "tool execution failed"
            );
        }
        result
    }

    async fn run_handler(&self, tool: &dyn Tool, args: &ToolArgs) -> ToolResult {
        match tokio::time::timeout(self.timeout, tool.execute(args)).await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => ToolResult::failed(format!("{error:#}")),
            Err(_) => ToolResult::failed(format!(
                "{} timed out after {}s",
                tool.name(),
                self.timeout.as_secs()
            )),
        }
    }
}

fn missing_required(tool: &dyn Tool, args: &ToolArgs) -> Option<String> {
    tool.parameters()
        .into_iter()
        .filter(|param| param.required)
        .find(|param| matches!(args.get(&param.name), None | Some(Value::Null)))
        .map(|param| param.name)
}
