//! Read Tool Implementation
//!
//! Reads file contents with line numbers and offset/limit support.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::Tool;

use super::common::{is_probably_binary, required_str, sandboxed, truncate_chars};

const DEFAULT_LIMIT: usize = 2000;
const MAX_LINE_CHARS: usize = 2000;

/// Read file tool
pub struct ReadTool;

impl ReadTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "Read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file inside the working root. Returns the file contents with line numbers. Supports optional offset and limit for reading specific portions of large files."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "file_path".to_string(),
            ParameterSchema::string(Some("Path to the file, relative to the working root or absolute inside it")),
        );
        properties.insert(
            "offset".to_string(),
            ParameterSchema::integer(Some("The line number to start reading from (1-indexed)")),
        );
        properties.insert(
            "limit".to_string(),
            ParameterSchema::integer(Some("Maximum number of lines to read")),
        );
        ParameterSchema::object(
            Some("Read file parameters"),
            properties,
            vec!["file_path".to_string()],
        )
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let file_path = required_str(&args, "file_path")?;
        let path = sandboxed(ctx, file_path)?;

        if !path.exists() {
            return Err(CoreError::not_found(format!("File not found: {}", file_path)));
        }
        if path.is_dir() {
            return Err(CoreError::validation(format!(
                "{} is a directory; use LS to list it",
                file_path
            )));
        }

        let offset = args.get("offset").and_then(|v| v.as_u64()).unwrap_or(1) as usize;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_LIMIT);

        let bytes = tokio::fs::read(&path).await?;
        if is_probably_binary(&bytes) {
            return Ok(InvocationResult::text(format!(
                "[binary file skipped] {} ({} bytes)",
                path.display(),
                bytes.len()
            )));
        }

        let content = String::from_utf8_lossy(&bytes);
        let all_lines: Vec<&str> = content.lines().collect();
        if all_lines.is_empty() {
            return Ok(InvocationResult::text(format!("(empty file) {}", path.display())));
        }

        let start = offset.saturating_sub(1).min(all_lines.len());
        let end = start.saturating_add(limit).min(all_lines.len());

        let mut numbered: Vec<String> = all_lines[start..end]
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let shown = if line.len() > MAX_LINE_CHARS {
                    format!("{}...", truncate_chars(line, MAX_LINE_CHARS))
                } else {
                    line.to_string()
                };
                format!("{:6}\t{}", start + i + 1, shown)
            })
            .collect();

        if end < all_lines.len() {
            numbered.push(format!(
                "... ({} more lines; continue with offset {})",
                all_lines.len() - end,
                end + 1
            ));
        }

        Ok(InvocationResult::text(numbered.join("\n")))
    }
}
