//! Write Tool Implementation
//!
//! Creates or overwrites a file inside the working root.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::Tool;

use super::common::{required_str, sandboxed};

/// Write file tool
pub struct WriteTool;

impl WriteTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "Write"
    }

    fn description(&self) -> &str {
        "Write content to a file inside the working root. Creates the file and any missing parent directories, or overwrites an existing file."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ParameterSchema::string(Some("Path to the file to write")),
        );
        properties.insert(
            "content".to_string(),
            ParameterSchema::string(Some("The content to write to the file")),
        );
        ParameterSchema::object(
            Some("Write file parameters"),
            properties,
            vec!["file_path".to_string(), "content".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let file_path = required_str(&args, "file_path")?;
        let content = required_str(&args, "content")?;
        let path = sandboxed(ctx, file_path)?;

        if path.is_dir() {
            return Err(CoreError::validation(format!("{} is a directory", file_path)));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(InvocationResult::text(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            path.display()
        )))
    }
}
