use super::types::{ToolArgs, ToolParameter, ToolResult, ToolSpec, parameters_schema};
use crate::security::RiskLevel;
use std::future::Future;
use std::pin::Pin;

/// A capability the model can invoke by name.
pub trait Tool: Send + Sync {
    /// Tool name (used in LLM function calling)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Declared parameters; required ones are checked before dispatch
    fn parameters(&self) -> Vec<ToolParameter>;

    fn risk_level(&self) -> RiskLevel;

    /// Execute the tool with given arguments
    fn execute<'a>(
        &'a self,
        args: &'a ToolArgs,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>>;

    /// Function-calling definition sent to the provider.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: parameters_schema(&self.parameters()),
        }
    }
}
