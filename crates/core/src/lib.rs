//! Agent Runtime Core
//!
//! Foundational types for the agent runtime workspace. This crate has no
//! dependencies on transports, providers, or the orchestration loop.
//!
//! ## Module Organization
//!
//! - `error` - Error taxonomy shared by every layer (`CoreError`, `CoreResult`)
//! - `context` - Invocation context (`ExecutionContext`, `ToolContext`, `OrchestratorContext`)
//! - `capability` - Capability descriptors and the uniform invocation result shape
//!
//! ## Design Principles
//!
//! 1. **Only serde/thiserror** - keeps build times minimal
//! 2. **Explicit working root** - every sandboxed call receives its root through context
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod capability;
pub mod context;
pub mod error;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Context Hierarchy ──────────────────────────────────────────────────
pub use context::{ExecutionContext, OrchestratorContext, ToolContext};

// ── Capability Shapes ──────────────────────────────────────────────────
pub use capability::{CapabilityDescriptor, CapabilityOrigin, ContentPart, InvocationResult};
