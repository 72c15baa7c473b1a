//! Context Hierarchy
//!
//! Two concrete scopes share one read-only base:
//!
//! 1. `ExecutionContext` trait - correlation id and working root
//! 2. `OrchestratorContext` - one per conversational turn, owned by the loop
//! 3. `ToolContext` - one per capability invocation, derived from the turn
//!
//! The working root is never read from process-global state. A context built
//! without one makes every sandboxed capability fail closed.

use std::path::{Path, PathBuf};

// ============================================================================
// ExecutionContext Trait
// ============================================================================

/// Base execution context shared by every scope.
pub trait ExecutionContext: Send + Sync {
    /// Identifier of the conversational turn this execution belongs to.
    fn correlation_id(&self) -> &str;

    /// Root that relative paths resolve against, if one was configured.
    fn working_root(&self) -> Option<&Path>;
}

// ============================================================================
// ToolContext
// ============================================================================

/// Context handed to a single capability invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    correlation_id: String,
    working_root: Option<PathBuf>,
    tool_call_id: String,
}

impl ToolContext {
    pub fn new(
        correlation_id: impl Into<String>,
        working_root: Option<PathBuf>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            working_root,
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Returns the call id the model assigned to this invocation.
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }
}

impl ExecutionContext for ToolContext {
    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn working_root(&self) -> Option<&Path> {
        self.working_root.as_deref()
    }
}

// ============================================================================
// OrchestratorContext
// ============================================================================

/// Turn-scoped context. Hands out a fresh `ToolContext` per requested action.
#[derive(Debug, Clone)]
pub struct OrchestratorContext {
    correlation_id: String,
    working_root: Option<PathBuf>,
}

impl OrchestratorContext {
    pub fn new(correlation_id: impl Into<String>, working_root: Option<PathBuf>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            working_root,
        }
    }

    /// Derive the context for one invocation inside this turn.
    pub fn tool_context(&self, tool_call_id: impl Into<String>) -> ToolContext {
        ToolContext::new(
            self.correlation_id.clone(),
            self.working_root.clone(),
            tool_call_id,
        )
    }
}

impl ExecutionContext for OrchestratorContext {
    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn working_root(&self) -> Option<&Path> {
        self.working_root.as_deref()
    }
}
