//! Edit Tool Implementation
//!
//! Replaces one occurrence of a string in a file (or all of them with
//! `replace_all`). Target location follows `agent_runtime_tools::text_edit`.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::{apply_edit, Tool};

use super::common::{optional_bool, required_str, sandboxed};

/// Edit file tool
pub struct EditTool;

impl EditTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EditTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "Edit"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing old_string with new_string. old_string must identify a single location in the file unless replace_all is set."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ParameterSchema::string(Some("Path to the file to edit")),
        );
        properties.insert(
            "old_string".to_string(),
            ParameterSchema::string(Some("The exact text to replace")),
        );
        properties.insert(
            "new_string".to_string(),
            ParameterSchema::string(Some("The replacement text")),
        );
        properties.insert(
            "replace_all".to_string(),
            ParameterSchema::boolean(Some("Replace every occurrence (default: false)")),
        );
        ParameterSchema::object(
            Some("Edit file parameters"),
            properties,
            vec![
                "file_path".to_string(),
                "old_string".to_string(),
                "new_string".to_string(),
            ],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let file_path = required_str(&args, "file_path")?;
        let old_string = required_str(&args, "old_string")?;
        let new_string = required_str(&args, "new_string")?;
        let replace_all = optional_bool(&args, "replace_all");

        let path = sandboxed(ctx, file_path)?;
        if !path.is_file() {
            return Err(CoreError::not_found(format!("File not found: {}", file_path)));
        }

        let bytes = tokio::fs::read(&path).await?;
        let content = String::from_utf8(bytes).map_err(|_| {
            CoreError::invocation(format!("{} is not valid UTF-8 text", file_path))
        })?;

        let outcome = apply_edit(&content, old_string, new_string, replace_all)?;
        tokio::fs::write(&path, &outcome.content).await?;

        Ok(InvocationResult::text(format!(
            "Successfully edited {} ({} replacement{})",
            path.display(),
            outcome.replacements,
            if outcome.replacements == 1 { "" } else { "s" }
        )))
    }
}
