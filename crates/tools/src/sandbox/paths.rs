//! Path Confinement
//!
//! Relative paths resolve against the working root from the invocation
//! context. The escape check is purely lexical and runs before any filesystem
//! call; only paths that pass it are canonicalized to catch symlinks pointing
//! out of the root. No root means no access.

use std::path::{Component, Path, PathBuf};

use agent_runtime_core::{CoreError, CoreResult};

use super::sensitive::match_sensitive_path;

/// Resolve `.` and `..` without consulting the filesystem.
///
/// `..` never climbs above the filesystem root or a path prefix.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-append the rest.
fn canonicalize_existing_prefix(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(real) = existing.canonicalize() {
            let mut out = real;
            for part in rest.iter().rev() {
                out.push(part);
            }
            return Some(out);
        }
        rest.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

/// Resolve `raw` inside `working_root`, or deny.
///
/// Denied when no root is configured, when the path escapes the root by
/// traversal, absolute path or symlink, or when it names a sensitive file.
pub fn resolve_path(working_root: Option<&Path>, raw: &str) -> CoreResult<PathBuf> {
    let root = working_root.ok_or_else(|| {
        CoreError::denied("No working root is configured; filesystem access is disabled")
    })?;
    if raw.trim().is_empty() {
        return Err(CoreError::validation("Path must not be empty"));
    }
    if raw.contains('\0') {
        return Err(CoreError::denied("Path contains a NUL byte"));
    }
    if !root.is_absolute() {
        return Err(CoreError::denied(format!(
            "Working root '{}' is not absolute",
            root.display()
        )));
    }

    let root = normalize_lexically(root);
    let requested = Path::new(raw);
    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };
    let normalized = normalize_lexically(&candidate);

    if !normalized.starts_with(&root) {
        return Err(CoreError::denied(format!(
            "Path '{}' resolves outside the working root",
            raw
        )));
    }
    if let Some(hit) = match_sensitive_path(&normalized) {
        return Err(CoreError::denied(format!(
            "Path '{}' matches a protected location ({})",
            raw, hit.description
        )));
    }

    // Symlinks can only be judged against the real filesystem.
    let real_root = root.canonicalize().unwrap_or_else(|_| root.clone());
    if let Some(real) = canonicalize_existing_prefix(&normalized) {
        if !real.starts_with(&real_root) {
            return Err(CoreError::denied(format!(
                "Path '{}' links outside the working root",
                raw
            )));
        }
        if let Some(hit) = match_sensitive_path(&real) {
            return Err(CoreError::denied(format!(
                "Path '{}' links to a protected location ({})",
                raw, hit.description
            )));
        }
    }

    Ok(normalized)
}
