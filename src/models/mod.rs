//! Data Models
//!
//! Configuration, provider, and turn-outcome data structures.

pub mod mcp;
pub mod orchestrator;
pub mod settings;

pub use mcp::*;
pub use orchestrator::*;
pub use settings::*;
