//! Execution Sandbox
//!
//! Applied by every filesystem- or shell-touching local capability before it
//! touches the substrate:
//!
//! - `paths` - confinement to the working root carried by the invocation context
//! - `sensitive` - fixed table of credential/key/database paths denied even inside the root
//! - `commands` - shell command blacklist and parent-traversal heuristic
//!
//! Every denial is a `CoreError::SandboxDenied`, which the registry turns into
//! an error-flagged result.

pub mod commands;
pub mod paths;
pub mod sensitive;

pub use commands::validate_command;
pub use paths::{normalize_lexically, resolve_path};
pub use sensitive::{match_sensitive_path, SensitiveMatch};
