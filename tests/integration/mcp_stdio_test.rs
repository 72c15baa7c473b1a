//! Protocol Client Integration Tests
//!
//! Runs a small python3 provider as a subprocess and exercises the
//! handshake, catalog listing, invocation, response correlation, timeouts
//! and bulk rejection on disconnect. Tests return early when python3 is not
//! installed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use agent_runtime::models::mcp::{ConnectionState, McpServerConfig};
use agent_runtime::services::tools::{McpClient, McpManager};
use agent_runtime_core::{CoreError, ToolContext};
use agent_runtime_tools::ToolRegistry;

const MOCK_PROVIDER: &str = r#"
import json, os, sys, threading, time

lock = threading.Lock()

def send(msg):
    with lock:
        sys.stdout.write(json.dumps(msg) + "\n")
        sys.stdout.flush()

def reply(id, result):
    send({"jsonrpc": "2.0", "id": id, "result": result})

def call(id, params):
    name = params.get("name")
    args = params.get("arguments") or {}
    if name == "echo":
        time.sleep(float(args.get("delay", 0)))
        reply(id, {"content": [{"type": "text", "text": str(args.get("x", ""))}]})
    elif name == "fail":
        reply(id, {"content": [{"type": "text", "text": "boom"}], "isError": True})
    elif name == "hang":
        return
    elif name == "exit":
        os._exit(0)
    else:
        send({"jsonrpc": "2.0", "id": id, "error": {"code": -32602, "message": "unknown tool " + str(name)}})

for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    msg = json.loads(line)
    method = msg.get("method")
    id = msg.get("id")
    if id is None:
        continue
    if method == "initialize":
        send({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}})
        with lock:
            sys.stdout.write("this is not json\n")
            sys.stdout.flush()
        sys.stderr.write("mock provider starting\n")
        reply(id, {
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "mock", "version": "1.0"},
        })
    elif method == "tools/list":
        reply(id, {"tools": [
            {"name": "echo", "description": "Echo x", "inputSchema": {
                "type": "object",
                "properties": {"x": {"type": "string"}, "delay": {"type": "number"}},
                "required": ["x"]}},
            {"name": "fail", "description": "Always fails", "inputSchema": {"type": "object"}},
            {"name": "hang", "description": "Never answers", "inputSchema": {"type": "object"}},
            {"name": "exit", "description": "Kills the provider", "inputSchema": {"type": "object"}},
        ]})
    elif method == "tools/call":
        threading.Thread(target=call, args=(id, msg.get("params") or {}), daemon=True).start()
    else:
        send({"jsonrpc": "2.0", "id": id, "error": {"code": -32601, "message": "method not found"}})
"#;

/// Answers `initialize` with a bare number.
const BAD_HANDSHAKE_PROVIDER: &str = r#"
import json, sys

for line in sys.stdin:
    msg = json.loads(line)
    if msg.get("id") is not None:
        sys.stdout.write(json.dumps({"jsonrpc": "2.0", "id": msg["id"], "result": 5}) + "\n")
        sys.stdout.flush()
"#;

fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Writes the mock provider script and returns its config.
fn mock_config(dir: &TempDir, name: &str) -> McpServerConfig {
    let script = dir.path().join("mock_provider.py");
    std::fs::write(&script, MOCK_PROVIDER).unwrap();
    McpServerConfig::stdio(name, "python3", vec![script.display().to_string()])
}

async fn connect(dir: &TempDir, timeout: Duration) -> McpClient {
    McpClient::connect(&mock_config(dir, "mock"), timeout)
        .await
        .expect("mock provider should connect")
}

async fn wait_for_pending(client: &McpClient, count: usize) {
    for _ in 0..200 {
        if client.pending_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} pending requests, have {}", count, client.pending_count());
}

#[tokio::test]
async fn test_handshake_list_and_call() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let client = connect(&dir, Duration::from_secs(10)).await;

    assert!(client.is_ready());
    assert_eq!(client.transport_kind(), "stdio");
    let info = client.server_info().unwrap();
    assert_eq!(info.protocol_version, "2024-11-05");
    assert_eq!(info.server_info["name"], "mock");

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "fail", "hang", "exit"]);

    let result = client.call_tool("echo", json!({"x": "hello"})).await.unwrap();
    assert!(!result.is_error);
    assert_eq!(result.to_text(), "hello");

    let failed = client.call_tool("fail", json!({})).await.unwrap();
    assert!(failed.is_error);
    assert_eq!(failed.to_text(), "boom");

    let unknown = client.call_tool("nope", json!({})).await.unwrap();
    assert!(unknown.is_error);
    assert!(unknown.to_text().contains("unknown tool"));

    assert_eq!(client.pending_count(), 0);
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_out_of_order_responses_are_correlated() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let client = connect(&dir, Duration::from_secs(10)).await;

    let (slow, fast) = tokio::join!(
        client.call_tool("echo", json!({"x": "slow", "delay": 0.5})),
        client.call_tool("echo", json!({"x": "fast"})),
    );
    assert_eq!(slow.unwrap().to_text(), "slow");
    assert_eq!(fast.unwrap().to_text(), "fast");
    assert_eq!(client.pending_count(), 0);

    client.disconnect().await;
}

#[tokio::test]
async fn test_timeout_releases_request() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let client = connect(&dir, Duration::from_millis(300)).await;

    let err = client.call_tool("hang", json!({})).await.unwrap_err();
    assert!(err.is_timeout(), "got {:?}", err);
    assert_eq!(client.pending_count(), 0);

    // The connection stays usable
    let result = client.call_tool("echo", json!({"x": "still here"})).await.unwrap();
    assert_eq!(result.to_text(), "still here");

    client.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_rejects_every_pending_request() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let client = Arc::new(connect(&dir, Duration::from_secs(30)).await);

    let mut handles = Vec::new();
    for _ in 0..3 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.call_tool("hang", json!({})).await
        }));
    }
    wait_for_pending(&client, 3).await;

    client.disconnect().await;

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_closed_connection(), "got {:?}", err);
    }
    assert_eq!(client.pending_count(), 0);

    // Requests after disconnect fail immediately
    let err = client.call_tool("echo", json!({"x": "late"})).await.unwrap_err();
    assert!(err.to_string().contains("not ready"));
}

#[tokio::test]
async fn test_provider_exit_rejects_every_pending_request() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let client = Arc::new(connect(&dir, Duration::from_secs(30)).await);

    let mut handles = Vec::new();
    for _ in 0..2 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.call_tool("hang", json!({})).await
        }));
    }
    wait_for_pending(&client, 2).await;

    let exit_err = client.call_tool("exit", json!({})).await.unwrap_err();
    assert!(exit_err.is_closed_connection(), "got {:?}", exit_err);

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_closed_connection(), "got {:?}", err);
    }
    assert_eq!(client.pending_count(), 0);
    assert_eq!(client.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_manager_registers_and_unregisters_capabilities() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let registry = ToolRegistry::new();
    let manager = McpManager::new(Duration::from_secs(10));

    let info = manager
        .connect_server(&mock_config(&dir, "mock"), &registry)
        .await
        .unwrap();
    assert_eq!(info.server_name, "mock");
    assert_eq!(
        info.qualified_tool_names,
        vec!["mcp:mock:echo", "mcp:mock:fail", "mcp:mock:hang", "mcp:mock:exit"]
    );
    assert!(manager.is_connected("mock").await);
    assert_eq!(manager.connected_count().await, 1);

    let ctx = ToolContext::new("turn", None, "call-1");
    let echoed = registry.invoke("mcp:mock:echo", json!({"x": "remote"}), &ctx).await;
    assert!(!echoed.is_error);
    assert_eq!(echoed.to_text(), "remote");

    let failed = registry.invoke("mcp:mock:fail", json!({}), &ctx).await;
    assert!(failed.is_error);

    // Connecting the same name twice is rejected
    assert!(manager
        .connect_server(&mock_config(&dir, "mock"), &registry)
        .await
        .is_err());

    manager.disconnect_server("mock", &registry).await.unwrap();
    assert!(!manager.is_connected("mock").await);
    assert!(registry.names_for_provider("mock").is_empty());
    assert!(!registry.contains("mcp:mock:echo"));
}

#[tokio::test]
async fn test_dead_provider_surfaces_as_unavailable() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let registry = ToolRegistry::new();
    let manager = McpManager::new(Duration::from_secs(10));
    manager
        .connect_server(&mock_config(&dir, "mock"), &registry)
        .await
        .unwrap();

    let ctx = ToolContext::new("turn", None, "call-1");
    let killed = registry.invoke("mcp:mock:exit", json!({}), &ctx).await;
    assert!(killed.is_error);

    let after = registry.invoke("mcp:mock:echo", json!({"x": "a"}), &ctx).await;
    assert!(after.is_error);
    assert!(after.to_text().contains("Capability unavailable"), "{}", after.to_text());

    manager.disconnect_all(&registry).await;
    assert_eq!(manager.connected_count().await, 0);
}

#[tokio::test]
async fn test_malformed_handshake_is_protocol_error() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("bad_provider.py");
    std::fs::write(&script, BAD_HANDSHAKE_PROVIDER).unwrap();
    let config = McpServerConfig::stdio("bad", "python3", vec![script.display().to_string()]);

    let err = McpClient::connect(&config, Duration::from_secs(10))
        .await
        .err()
        .expect("a numeric initialize result must be rejected");
    assert!(matches!(err, CoreError::Protocol(_)), "got {:?}", err);

    let registry = ToolRegistry::new();
    let manager = McpManager::new(Duration::from_secs(10));
    assert!(manager.connect_server(&config, &registry).await.is_err());
    assert!(!manager.is_connected("bad").await);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_concurrent_connects_of_one_name_keep_the_catalog() {
    if !python3_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let registry = ToolRegistry::new();
    let manager = McpManager::new(Duration::from_secs(10));
    let config = mock_config(&dir, "mock");

    let (first, second) = tokio::join!(
        manager.connect_server(&config, &registry),
        manager.connect_server(&config, &registry),
    );
    assert!(first.is_ok() ^ second.is_ok());
    assert_eq!(manager.connected_count().await, 1);
    assert_eq!(registry.names_for_provider("mock").len(), 4);

    let ctx = ToolContext::new("turn", None, "call-1");
    let echoed = registry.invoke("mcp:mock:echo", json!({"x": "kept"}), &ctx).await;
    assert!(!echoed.is_error, "{}", echoed.to_text());
    assert_eq!(echoed.to_text(), "kept");

    manager.disconnect_all(&registry).await;
}
