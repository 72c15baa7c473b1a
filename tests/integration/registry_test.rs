//! Capability Registry Integration Tests
//!
//! Overwrite semantics, scoped catalogs and error conversion on invoke.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agent_runtime::services::tools::register_builtin_tools;
use agent_runtime_core::{CoreError, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::{FunctionTool, ToolRegistry};
use serde_json::json;

fn fixed_tool(name: &str, reply: &'static str) -> Arc<FunctionTool> {
    Arc::new(FunctionTool::new(
        name,
        format!("Always answers {}", reply),
        ParameterSchema::object(None, HashMap::new(), Vec::new()),
        move |_ctx, _args| async move { Ok(InvocationResult::text(reply)) },
    ))
}

fn ctx() -> ToolContext {
    ToolContext::new("turn-1", None, "call-1")
}

#[tokio::test]
async fn test_duplicate_registration_overwrites_without_error() {
    let registry = ToolRegistry::new();
    assert!(!registry.register(fixed_tool("echo", "first")));
    assert!(registry.register(fixed_tool("echo", "second")));

    assert_eq!(registry.len(), 1);
    let result = registry.invoke("echo", json!({}), &ctx()).await;
    assert_eq!(result.to_text(), "second");
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_unknown_capability_becomes_error_result() {
    let registry = ToolRegistry::new();
    let result = registry.invoke("nope", json!({}), &ctx()).await;
    assert!(result.is_error);
    assert!(result.to_text().contains("Unknown tool"));
}

#[tokio::test]
async fn test_failing_capability_becomes_error_result() {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(FunctionTool::new(
        "broken",
        "Always fails",
        ParameterSchema::object(None, HashMap::new(), Vec::new()),
        |_ctx, _args| async { Err(CoreError::invocation("disk on fire")) },
    )));

    let result = registry.invoke("broken", json!({}), &ctx()).await;
    assert!(result.is_error);
    assert!(result.to_text().contains("disk on fire"));
}

#[test]
fn test_catalog_scoping() {
    let registry = ToolRegistry::new();
    registry.register(fixed_tool("a", "1"));
    registry.register(fixed_tool("b", "2"));
    registry.register(Arc::new(
        FunctionTool::new(
            "c",
            "read-only",
            ParameterSchema::object(None, HashMap::new(), Vec::new()),
            |_ctx, _args| async { Ok(InvocationResult::text("3")) },
        )
        .read_only(),
    ));

    let all: Vec<String> = registry.catalog_for(None).into_iter().map(|d| d.name).collect();
    assert_eq!(all, vec!["a", "b", "c"]);

    let scope = vec!["c".to_string(), "a".to_string(), "missing".to_string()];
    let mut scoped: Vec<String> = registry
        .catalog_for(Some(&scope))
        .into_iter()
        .map(|d| d.name)
        .collect();
    scoped.sort();
    assert_eq!(scoped, vec!["a", "c"]);

    let read_only: Vec<String> = registry.read_only_catalog().into_iter().map(|d| d.name).collect();
    assert_eq!(read_only, vec!["c"]);
}

#[test]
fn test_builtin_catalog_schemas() {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry, Duration::from_secs(5));

    for definition in registry.definitions() {
        assert!(!definition.description.is_empty(), "{} lacks a description", definition.name);
        assert_eq!(definition.input_schema.schema_type, "object");
    }
    let read = registry.lookup("Read").unwrap();
    assert!(!read.risky);
    let bash = registry.lookup("Bash").unwrap();
    assert!(bash.risky);
}
