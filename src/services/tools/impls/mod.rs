//! Built-in Capabilities
//!
//! Each local capability is a struct implementing the `Tool` trait. All of
//! them resolve paths through the sandbox against the invocation's working
//! root.

mod common;

pub mod bash;
pub mod cwd;
pub mod edit;
pub mod glob;
pub mod grep;
pub mod ls;
pub mod read;
pub mod write;

pub use bash::BashTool;
pub use cwd::CwdTool;
pub use edit::EditTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use ls::LsTool;
pub use read::ReadTool;
pub use write::WriteTool;

use std::sync::Arc;
use std::time::Duration;

use agent_runtime_tools::ToolRegistry;

/// Register every built-in capability.
pub fn register_builtin_tools(registry: &ToolRegistry, command_timeout: Duration) {
    registry.register(Arc::new(ReadTool::new()));
    registry.register(Arc::new(WriteTool::new()));
    registry.register(Arc::new(EditTool::new()));
    registry.register(Arc::new(LsTool::new()));
    registry.register(Arc::new(GrepTool::new()));
    registry.register(Arc::new(GlobTool::new()));
    registry.register(Arc::new(CwdTool::new()));
    registry.register(Arc::new(BashTool::new(command_timeout)));
}
