//! Agent Runtime LLM
//!
//! Transcript types exchanged with the generation capability, and the
//! `LlmProvider` trait the orchestration loop consumes. Concrete model
//! clients live outside this workspace; the loop treats generation as opaque.

pub mod provider;
pub mod types;

// Re-export main types
pub use provider::LlmProvider;
pub use types::*;
