pub mod factory;
pub mod filesystem;
pub mod memory;
pub mod registry;
pub mod shell;
pub mod traits;
pub mod types;

pub use factory::default_registry;
pub use filesystem::FilesystemTool;
pub use memory::MemoryTool;
pub use registry::ToolRegistry;
pub use shell::ShellTool;
pub use traits::Tool;
pub use types::{ParamKind, ToolArgs, ToolParameter, ToolResult, ToolSpec, parameters_schema};
