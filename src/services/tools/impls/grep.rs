//! Grep Tool Implementation
//!
//! Regex search across files under the working root. Honors .gitignore and
//! never opens files on the sensitive-path table.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::sandbox::match_sensitive_path;
use agent_runtime_tools::Tool;

use super::common::{
    display_relative, is_probably_binary, optional_bool, optional_str, required_str, sandboxed,
    truncate_chars, working_root, MAX_OUTPUT_CHARS,
};

const DEFAULT_HEAD_LIMIT: usize = 200;

/// Content search tool
pub struct GrepTool;

impl GrepTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrepTool {
    fn default() -> Self {
        Self::new()
    }
}

struct SearchState {
    results: Vec<String>,
    output_len: usize,
    head_limit: usize,
}

impl SearchState {
    fn full(&self) -> bool {
        self.results.len() >= self.head_limit || self.output_len >= MAX_OUTPUT_CHARS
    }

    fn push(&mut self, line: String) {
        self.output_len += line.len() + 1;
        self.results.push(line);
    }
}

fn grep_file(root: &Path, path: &Path, regex: &regex::Regex, files_only: bool, state: &mut SearchState) {
    if match_sensitive_path(path).is_some() {
        return;
    }
    let Ok(bytes) = std::fs::read(path) else {
        return;
    };
    if is_probably_binary(&bytes) {
        return;
    }
    let content = String::from_utf8_lossy(&bytes);
    let shown = display_relative(root, path);

    for (idx, line) in content.lines().enumerate() {
        if state.full() {
            return;
        }
        if regex.is_match(line) {
            if files_only {
                state.push(shown);
                return;
            }
            state.push(format!("{}:{}:{}", shown, idx + 1, truncate_chars(line, 500)));
        }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "Grep"
    }

    fn description(&self) -> &str {
        "Search file contents under the working root with a regular expression. Returns matching lines as path:line:text, or only file paths with files_only. Respects .gitignore."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "pattern".to_string(),
            ParameterSchema::string(Some("Regular expression to search for")),
        );
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("File or directory to search (default: working root)")),
        );
        properties.insert(
            "glob".to_string(),
            ParameterSchema::string(Some("Only search files matching this glob (e.g. '*.rs')")),
        );
        properties.insert(
            "case_insensitive".to_string(),
            ParameterSchema::boolean(Some("Case-insensitive matching")),
        );
        properties.insert(
            "files_only".to_string(),
            ParameterSchema::boolean(Some("Return only paths of matching files")),
        );
        properties.insert(
            "head_limit".to_string(),
            ParameterSchema::integer(Some("Maximum number of results (default: 200)")),
        );
        ParameterSchema::object(
            Some("Grep parameters"),
            properties,
            vec!["pattern".to_string()],
        )
    }

    fn is_read_only(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let pattern = required_str(&args, "pattern")?;
        let root = working_root(ctx)?;
        let search_path = sandboxed(ctx, optional_str(&args, "path").unwrap_or("."))?;
        if !search_path.exists() {
            return Err(CoreError::not_found(format!(
                "Path not found: {}",
                search_path.display()
            )));
        }

        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(optional_bool(&args, "case_insensitive"))
            .build()
            .map_err(|e| CoreError::validation(format!("Invalid regex pattern: {}", e)))?;

        let glob_matcher = match optional_str(&args, "glob") {
            Some(g) => Some(
                ignore::overrides::OverrideBuilder::new(&search_path)
                    .add(g)
                    .and_then(|b| b.build())
                    .map_err(|e| CoreError::validation(format!("Invalid glob: {}", e)))?,
            ),
            None => None,
        };
        let files_only = optional_bool(&args, "files_only");
        let head_limit = args
            .get("head_limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_HEAD_LIMIT);

        let mut state = SearchState {
            results: Vec::new(),
            output_len: 0,
            head_limit,
        };

        if search_path.is_file() {
            grep_file(&root, &search_path, &regex, files_only, &mut state);
        } else {
            let walker = ignore::WalkBuilder::new(&search_path)
                .hidden(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .require_git(false)
                .build();

            for entry in walker.flatten() {
                if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                    continue;
                }
                let path = entry.path();
                if let Some(ref overrides) = glob_matcher {
                    match overrides.matched(path, false) {
                        ignore::Match::None | ignore::Match::Ignore(..) => continue,
                        ignore::Match::Whitelist(..) => {}
                    }
                }
                grep_file(&root, path, &regex, files_only, &mut state);
                if state.full() {
                    break;
                }
            }
        }

        if state.results.is_empty() {
            return Ok(InvocationResult::text("No matches found"));
        }
        let truncated = state.full();
        let mut output = state.results.join("\n");
        if truncated {
            output.push_str("\n\n... (results truncated)");
        }
        Ok(InvocationResult::text(output))
    }
}
