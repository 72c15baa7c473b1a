//! Sandbox Integration Tests
//!
//! Denials happen before the filesystem or a shell is touched, and surface
//! as error-flagged results when routed through the registry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_runtime::services::tools::register_builtin_tools;
use agent_runtime_core::{CoreError, ToolContext};
use agent_runtime_tools::{apply_edit, resolve_path, validate_command, ToolRegistry};
use serde_json::json;
use tempfile::TempDir;

fn builtin_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry, Duration::from_secs(10));
    registry
}

fn ctx_for(root: &Path) -> ToolContext {
    let root = root.canonicalize().unwrap();
    ToolContext::new("turn-sandbox", Some(root), "call-1")
}

#[test]
fn test_parent_traversal_is_denied() {
    let err = resolve_path(Some(Path::new("/project")), "../../etc/passwd").unwrap_err();
    assert!(matches!(err, CoreError::SandboxDenied(_)), "got {:?}", err);
}

#[test]
fn test_missing_root_fails_closed() {
    let err = resolve_path(None, "README.md").unwrap_err();
    assert!(err.is_denied());
}

#[test]
fn test_paths_inside_root_resolve() {
    let resolved = resolve_path(Some(Path::new("/project")), "src/../src/main.rs").unwrap();
    assert_eq!(resolved, PathBuf::from("/project/src/main.rs"));
}

#[test]
fn test_destructive_command_is_denied() {
    let err = validate_command("rm -rf /").unwrap_err();
    assert!(err.is_denied());
    assert!(validate_command("ls -la").is_ok());
}

#[test]
fn test_uppercase_recursive_flag_is_denied() {
    for cmd in ["rm -Rf /", "rm -fR /", "rm -R -f /", "rm -rf /"] {
        let err = validate_command(cmd).unwrap_err();
        assert!(err.is_denied(), "{} should be denied", cmd);
    }
}

#[tokio::test]
async fn test_uppercase_delete_never_reaches_shell() {
    let dir = TempDir::new().unwrap();
    let victim = dir.path().join("victim");
    std::fs::create_dir(&victim).unwrap();
    std::fs::write(victim.join("keep.txt"), "data").unwrap();
    let registry = builtin_registry();

    let result = registry
        .invoke("Bash", json!({"command": "rm -Rf victim"}), &ctx_for(dir.path()))
        .await;
    assert!(result.is_error);
    assert!(victim.join("keep.txt").exists());
}

#[test]
fn test_edit_heuristic() {
    // One raw occurrence is line-bounded, the other is not
    let out = apply_edit("foo\nbarfoo\n", "foo", "baz", false).unwrap();
    assert_eq!(out.content, "baz\nbarfoo\n");

    // Two line-bounded occurrences need disambiguation
    let err = apply_edit("foo\nfoo\n", "foo", "baz", false).unwrap_err();
    assert!(err.to_string().contains("appears 2 times"));
}

#[tokio::test]
async fn test_read_outside_root_is_error_observation() {
    let dir = TempDir::new().unwrap();
    let registry = builtin_registry();

    let result = registry
        .invoke("Read", json!({"file_path": "../../etc/passwd"}), &ctx_for(dir.path()))
        .await;
    assert!(result.is_error);
    assert!(result.to_text().contains("Access denied"));
}

#[tokio::test]
async fn test_sensitive_file_inside_root_is_denied() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "API_KEY=secret\n").unwrap();
    let registry = builtin_registry();

    let result = registry
        .invoke("Read", json!({"file_path": ".env"}), &ctx_for(dir.path()))
        .await;
    assert!(result.is_error);
    assert!(!result.to_text().contains("secret"));
}

#[tokio::test]
async fn test_blocked_command_never_reaches_shell() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("marker");
    let registry = builtin_registry();

    let command = format!("touch {} && rm -rf /", marker.display());
    let result = registry
        .invoke("Bash", json!({"command": command}), &ctx_for(dir.path()))
        .await;
    assert!(result.is_error);
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_write_edit_read_round_trip() {
    let dir = TempDir::new().unwrap();
    let ctx = ctx_for(dir.path());
    let registry = builtin_registry();

    let written = registry
        .invoke(
            "Write",
            json!({"file_path": "notes/todo.txt", "content": "alpha\nalpha beta\n"}),
            &ctx,
        )
        .await;
    assert!(!written.is_error, "{}", written.to_text());

    let edited = registry
        .invoke(
            "Edit",
            json!({"file_path": "notes/todo.txt", "old_string": "alpha", "new_string": "omega"}),
            &ctx,
        )
        .await;
    assert!(!edited.is_error, "{}", edited.to_text());

    let on_disk = std::fs::read_to_string(dir.path().join("notes/todo.txt")).unwrap();
    assert_eq!(on_disk, "omega\nalpha beta\n");

    let read = registry
        .invoke("Read", json!({"file_path": "notes/todo.txt"}), &ctx)
        .await;
    assert!(!read.is_error);
    assert!(read.to_text().contains("omega"));
}

#[tokio::test]
async fn test_cwd_reports_root_and_rootless_fails() {
    let dir = TempDir::new().unwrap();
    let registry = builtin_registry();

    let result = registry.invoke("Cwd", json!({}), &ctx_for(dir.path())).await;
    assert!(!result.is_error);
    let canonical = dir.path().canonicalize().unwrap();
    assert!(result.to_text().contains(&canonical.display().to_string()));

    let rootless = ToolContext::new("turn", None, "call");
    let result = registry.invoke("Cwd", json!({}), &rootless).await;
    assert!(result.is_error);
}
