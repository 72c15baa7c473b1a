//! Shared helpers for the built-in capabilities

use serde_json::Value;
use std::path::{Path, PathBuf};

use agent_runtime_core::{CoreError, CoreResult, ExecutionContext, ToolContext};
use agent_runtime_tools::resolve_path;

/// Output longer than this is cut and marked as truncated
pub(crate) const MAX_OUTPUT_CHARS: usize = 30_000;

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> CoreResult<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::validation(format!("Missing required parameter: {}", key)))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

pub(crate) fn optional_bool(args: &Value, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Confine `raw` to the invocation's working root.
pub(crate) fn sandboxed(ctx: &ToolContext, raw: &str) -> CoreResult<PathBuf> {
    resolve_path(ctx.working_root(), raw)
}

/// Working root of the invocation, required by every capability that
/// touches the filesystem or spawns processes.
pub(crate) fn working_root(ctx: &ToolContext) -> CoreResult<PathBuf> {
    sandboxed(ctx, ".")
}

/// Display a path relative to the root when possible.
pub(crate) fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// Heuristic check: does the byte buffer look like binary data?
///
/// Scans up to the first 4 KiB. Returns `true` when a NUL byte is found or
/// when more than 30% of bytes are not text-like.
pub(crate) fn is_probably_binary(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample = &bytes[..bytes.len().min(4096)];
    if sample.contains(&0) {
        return true;
    }
    let suspicious = sample
        .iter()
        .filter(|b| !matches!(**b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E | 0x80..=0xFF))
        .count();
    suspicious * 100 / sample.len() > 30
}

/// Cut `text` to `limit` bytes on a char boundary.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Apply the shared output limit.
pub(crate) fn limit_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT_CHARS {
        let keep = truncate_chars(&text, MAX_OUTPUT_CHARS).len();
        text.truncate(keep);
        text.push_str("\n\n... (output truncated)");
    }
    text
}
