//! LS Tool Implementation
//!
//! Lists a directory inside the working root.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::Tool;

use super::common::{optional_bool, optional_str, sandboxed};

fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Directory listing tool
pub struct LsTool;

impl LsTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "LS"
    }

    fn description(&self) -> &str {
        "List files and directories at a path inside the working root (default: the root itself). Hidden entries are skipped unless show_hidden is set."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("Directory to list (default: working root)")),
        );
        properties.insert(
            "show_hidden".to_string(),
            ParameterSchema::boolean(Some("Include entries whose names start with '.'")),
        );
        ParameterSchema::object(Some("LS parameters"), properties, vec![])
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let dir_path = optional_str(&args, "path").unwrap_or(".");
        let show_hidden = optional_bool(&args, "show_hidden");
        let path = sandboxed(ctx, dir_path)?;

        if !path.exists() {
            return Err(CoreError::not_found(format!("Directory not found: {}", dir_path)));
        }
        if !path.is_dir() {
            return Err(CoreError::validation(format!("Not a directory: {}", dir_path)));
        }

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut reader = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !show_hidden && name.starts_with('.') {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            if metadata.is_dir() {
                dirs.push(name);
            } else {
                files.push((name, metadata.len()));
            }
        }

        if dirs.is_empty() && files.is_empty() {
            return Ok(InvocationResult::text(format!(
                "Directory is empty: {}",
                path.display()
            )));
        }

        dirs.sort();
        files.sort();

        let mut output = format!("Directory: {}\n\n", path.display());
        for name in &dirs {
            output.push_str(&format!("  DIR   {:>10}  {}/\n", "-", name));
        }
        for (name, size) in &files {
            output.push_str(&format!("  FILE  {:>10}  {}\n", format_size(*size), name));
        }
        output.push_str(&format!("\n{} directories, {} files", dirs.len(), files.len()));

        Ok(InvocationResult::text(output))
    }
}
