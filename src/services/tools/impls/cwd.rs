//! Cwd Tool Implementation
//!
//! Returns the working root of the current turn.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use agent_runtime_core::{CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::Tool;

use super::common::working_root;

/// Cwd tool
pub struct CwdTool;

impl CwdTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CwdTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CwdTool {
    fn name(&self) -> &str {
        "Cwd"
    }

    fn description(&self) -> &str {
        "Get the working root. Every file path and shell command is confined to this directory."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::object(Some("No parameters required"), HashMap::new(), vec![])
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, _args: Value) -> CoreResult<InvocationResult> {
        let root = working_root(ctx)?;
        Ok(InvocationResult::text(root.to_string_lossy().to_string()))
    }
}
