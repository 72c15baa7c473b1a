//! MCP Client
//!
//! JSON-RPC 2.0 client for one capability provider. Requests from any
//! number of callers may be in flight at once; responses are matched back
//! to their callers by id regardless of arrival order.

use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use agent_runtime_core::{ContentPart, CoreError, CoreResult, InvocationResult};

use super::mcp_correlation::PendingRequests;
use super::mcp_protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use super::mcp_transport::{ConnectionStatus, Transport};
use crate::models::mcp::{ConnectionState, McpServerConfig, McpServerInfo, McpToolInfo};

/// Client for one provider connection
pub struct McpClient {
    name: String,
    transport: Transport,
    pending: Arc<PendingRequests>,
    status: Arc<ConnectionStatus>,
    server_info: RwLock<Option<McpServerInfo>>,
    tools: RwLock<Vec<McpToolInfo>>,
    request_timeout: Duration,
}

impl McpClient {
    /// Open the transport and perform the initialization handshake:
    /// 1. Send `initialize`
    /// 2. Record the provider's capabilities
    /// 3. Send `notifications/initialized`
    pub async fn connect(config: &McpServerConfig, request_timeout: Duration) -> CoreResult<Self> {
        let client = Self::open(config, request_timeout).await?;
        if let Err(e) = client.initialize().await {
            client.status.set(ConnectionState::Failed);
            client.transport.close().await;
            client.pending.close_all();
            return Err(e);
        }
        Ok(client)
    }

    /// Open the transport without handshaking.
    pub async fn open(config: &McpServerConfig, request_timeout: Duration) -> CoreResult<Self> {
        let pending = Arc::new(PendingRequests::new(config.name.clone()));
        let status = Arc::new(ConnectionStatus::new(ConnectionState::Connecting));

        let transport = match Transport::open(config, Arc::clone(&pending), Arc::clone(&status)).await {
            Ok(t) => t,
            Err(e) => {
                status.set(ConnectionState::Failed);
                return Err(e);
            }
        };

        Ok(Self {
            name: config.name.clone(),
            transport,
            pending,
            status,
            server_info: RwLock::new(None),
            tools: RwLock::new(Vec::new()),
            request_timeout,
        })
    }

    /// Perform the handshake on an opened connection.
    pub async fn initialize(&self) -> CoreResult<McpServerInfo> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "agent-runtime",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = self.request("initialize", Some(params)).await.map_err(|e| match e {
            CoreError::Protocol(msg) => CoreError::protocol(format!(
                "Provider '{}' initialization failed: {}",
                self.name, msg
            )),
            other => other,
        })?;

        let info = parse_server_info(&self.name, &result)?;

        self.notify("notifications/initialized", Some(serde_json::json!({})))
            .await?;

        *self.server_info.write().unwrap_or_else(|e| e.into_inner()) = Some(info.clone());
        self.status.set(ConnectionState::Ready);
        tracing::info!(
            provider = %self.name,
            protocol_version = %info.protocol_version,
            transport = self.transport.kind(),
            "Provider initialized"
        );
        Ok(info)
    }

    /// Fetch the provider's capability catalog.
    pub async fn list_tools(&self) -> CoreResult<Vec<McpToolInfo>> {
        let result = self.request("tools/list", None).await?;

        let entries = result
            .get("tools")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                CoreError::protocol(format!(
                    "Provider '{}' returned a catalog without a tools array",
                    self.name
                ))
            })?;

        let mut tools = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
                tracing::warn!(provider = %self.name, "Skipping catalog entry without a name");
                continue;
            };
            if name.is_empty() {
                continue;
            }
            tools.push(McpToolInfo {
                name: name.to_string(),
                description: entry
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                input_schema: entry
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
                provider: self.name.clone(),
            });
        }

        *self.tools.write().unwrap_or_else(|e| e.into_inner()) = tools.clone();
        Ok(tools)
    }

    /// Invoke a capability on the provider.
    ///
    /// Provider-side failures, whether an error envelope or a result with
    /// `isError`, come back as an error-flagged result. Transport failures
    /// and timeouts are returned as `Err`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> CoreResult<InvocationResult> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        let response = self.send_request("tools/call", Some(params)).await?;

        if let Some(error) = response.error {
            return Ok(InvocationResult::error(error.to_string()));
        }
        let result = response.result.unwrap_or(Value::Null);
        Ok(parse_call_result(&result))
    }

    /// Send a request and return its `result`, turning an error envelope
    /// into a protocol error.
    pub async fn request(&self, method: &str, params: Option<Value>) -> CoreResult<Value> {
        let response = self.send_request(method, params).await?;
        if let Some(error) = response.error {
            return Err(CoreError::protocol(format!("{} failed: {}", method, error)));
        }
        response
            .result
            .ok_or_else(|| CoreError::protocol(format!("{} response carried no result", method)))
    }

    /// Send a request and wait for its envelope.
    pub async fn send_request(&self, method: &str, params: Option<Value>) -> CoreResult<JsonRpcResponse> {
        self.ensure_usable(method)?;

        let (id, rx) = self.pending.register()?;
        let message = serde_json::to_value(JsonRpcRequest::new(id, method, params))?;

        if let Err(e) = self.transport.send(&message).await {
            self.pending.forget(id);
            return Err(e);
        }
        tracing::debug!(provider = %self.name, id, method, "Sent request");

        self.pending.wait(id, rx, self.request_timeout).await
    }

    /// Send a notification; nothing is awaited.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> CoreResult<()> {
        self.ensure_usable(method)?;
        let message = serde_json::to_value(JsonRpcNotification::new(method, params))?;
        self.transport.send(&message).await
    }

    /// Close the connection. Requests still in flight are rejected.
    pub async fn disconnect(&self) {
        self.status.set(ConnectionState::Disconnected);
        self.transport.close().await;
        self.pending.close_all();
        tracing::info!(provider = %self.name, "Provider disconnected");
    }

    fn ensure_usable(&self, method: &str) -> CoreResult<()> {
        match self.status.get() {
            ConnectionState::Ready => Ok(()),
            ConnectionState::Connecting if method == "initialize" || method.starts_with("notifications/") => {
                Ok(())
            }
            state => Err(CoreError::connection(format!(
                "Provider '{}' is not ready (state: {:?})",
                self.name, state
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        self.status.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    pub fn server_info(&self) -> Option<McpServerInfo> {
        self.server_info.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Catalog from the most recent `list_tools`.
    pub fn cached_tools(&self) -> Vec<McpToolInfo> {
        self.tools.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Requests currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }
}

/// Validate an `initialize` result. The result must be an object carrying a
/// string `protocolVersion`; `capabilities`, when present, must be an object.
pub fn parse_server_info(provider: &str, result: &Value) -> CoreResult<McpServerInfo> {
    let malformed = |what: &str| {
        CoreError::protocol(format!(
            "Provider '{}' sent a malformed initialize result: {}",
            provider, what
        ))
    };

    let obj = result
        .as_object()
        .ok_or_else(|| malformed("result is not an object"))?;
    let protocol_version = obj
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed("missing protocolVersion"))?;
    let capabilities = match obj.get("capabilities") {
        None => Value::Object(serde_json::Map::new()),
        Some(caps) if caps.is_object() => caps.clone(),
        Some(_) => return Err(malformed("capabilities is not an object")),
    };

    Ok(McpServerInfo {
        name: provider.to_string(),
        protocol_version: protocol_version.to_string(),
        capabilities,
        server_info: obj
            .get("serverInfo")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
    })
}

/// Convert a `tools/call` result into an invocation result.
pub fn parse_call_result(result: &Value) -> InvocationResult {
    let is_error = result
        .get("isError")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    match result.get("content").and_then(|v| v.as_array()) {
        Some(parts) => InvocationResult::from_parts(parts.iter().map(ContentPart::from_value).collect(), is_error),
        None => InvocationResult::from_parts(vec![ContentPart::text(result.to_string())], is_error),
    }
}
