use super::{FilesystemTool, MemoryTool, ShellTool, ToolRegistry};
use crate::config::Config;
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;

/// Registry with the shipped adapters, in a fixed order: filesystem, shell,
/// memory.
pub fn default_registry(config: &Config, store: &Store) -> ToolRegistry {
    let mut registry = ToolRegistry::new(Duration::from_secs(config.agent.tool_timeout_secs));
    registry.register(Arc::new(FilesystemTool::new(&config.workspace_dir)));
    registry.register(Arc::new(ShellTool::new(
        &config.workspace_dir,
        Duration::from_secs(config.agent.shell_timeout_secs),
    )));
    registry.register(Arc::new(MemoryTool::new(store.clone())));
    registry
}
