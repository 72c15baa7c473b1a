//! Agent Runtime Tools
//!
//! The capability side of the runtime, compiled independently of transports
//! and the orchestration loop:
//! - `Tool` trait - one invocation contract for local and remote capabilities
//! - `ToolRegistry` - add-or-overwrite registry with scoped catalogs
//! - `FunctionTool` - closure-based capability creation
//! - `sandbox` - path confinement, sensitive-path denial, command validation
//! - `text_edit` - unique-target replacement used by the Edit capability
//!
//! Concrete filesystem/shell capabilities and the remote-capability adapter
//! live in the main crate's `services::tools` module.

pub mod sandbox;
pub mod text_edit;
pub mod trait_def;

// Re-export core types
pub use sandbox::{resolve_path, validate_command, SensitiveMatch};
pub use text_edit::{apply_edit, locate_unique, EditOutcome};
pub use trait_def::{FunctionTool, Tool, ToolRegistry};
