//! Glob Tool Implementation
//!
//! Finds files by name pattern under the working root.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::SystemTime;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::sandbox::match_sensitive_path;
use agent_runtime_tools::Tool;

use super::common::{display_relative, optional_str, required_str, sandboxed, working_root};

const MAX_RESULTS: usize = 1000;

/// File pattern matching tool
pub struct GlobTool;

impl GlobTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GlobTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "Glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (e.g. '**/*.rs') under the working root. Results are sorted by modification time, newest first."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "pattern".to_string(),
            ParameterSchema::string(Some("Glob pattern relative to the search directory")),
        );
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("Directory to search in (default: working root)")),
        );
        ParameterSchema::object(
            Some("Glob parameters"),
            properties,
            vec!["pattern".to_string()],
        )
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let pattern = required_str(&args, "pattern")?;
        if pattern.starts_with('/') || pattern.split('/').any(|part| part == "..") {
            return Err(CoreError::denied(
                "Glob patterns must be relative and must not traverse upward",
            ));
        }

        let root = working_root(ctx)?;
        let base = sandboxed(ctx, optional_str(&args, "path").unwrap_or("."))?;
        let full_pattern = base.join(pattern).to_string_lossy().to_string();

        let paths = glob::glob(&full_pattern)
            .map_err(|e| CoreError::validation(format!("Invalid glob pattern: {}", e)))?;

        let mut matches: Vec<(SystemTime, String)> = paths
            .flatten()
            .filter(|p| p.starts_with(&root))
            .filter(|p| match_sensitive_path(p).is_none())
            .map(|p| {
                let modified = std::fs::metadata(&p)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, display_relative(&root, &p))
            })
            .collect();

        if matches.is_empty() {
            return Ok(InvocationResult::text("No files matched"));
        }

        matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let total = matches.len();
        let mut lines: Vec<String> = matches.into_iter().take(MAX_RESULTS).map(|(_, p)| p).collect();
        if total > MAX_RESULTS {
            lines.push(format!("... ({} more files not shown)", total - MAX_RESULTS));
        }
        Ok(InvocationResult::text(lines.join("\n")))
    }
}
