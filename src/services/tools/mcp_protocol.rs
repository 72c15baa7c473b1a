//! MCP Protocol Envelopes
//!
//! JSON-RPC 2.0 envelope types, inbound classification, and the record
//! splitter used by the process-spawn transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version declared in the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC version tag carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no id, never answered)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Request id as allocated by this client. Providers may echo it back as a
    /// number or as a numeric string.
    pub fn numeric_id(&self) -> Option<u64> {
        parse_id(self.id.as_ref()?)
    }
}

fn parse_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// What an inbound envelope turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Answer to one of our requests
    Response(JsonRpcResponse),
    /// Provider-initiated message without an id
    Notification { method: String },
    /// Provider-initiated request; this client serves none
    Request { method: String },
    /// Carries one of our ids but does not decode as a response
    MalformedResponse { id: u64, reason: String },
    /// Valid JSON that is not an envelope
    Invalid(String),
}

/// Classify one inbound JSON value.
pub fn classify(value: Value) -> Inbound {
    let Some(obj) = value.as_object() else {
        return Inbound::Invalid("envelope is not a JSON object".to_string());
    };

    if let Some(method) = obj.get("method").and_then(|m| m.as_str()) {
        let method = method.to_string();
        return match obj.get("id") {
            Some(id) if !id.is_null() => Inbound::Request { method },
            _ => Inbound::Notification { method },
        };
    }

    if !obj.contains_key("result") && !obj.contains_key("error") {
        return Inbound::Invalid("envelope has neither method nor result/error".to_string());
    }

    let id = obj.get("id").and_then(parse_id);
    match serde_json::from_value::<JsonRpcResponse>(value) {
        Ok(response) if response.id.as_ref().map_or(true, Value::is_null) => {
            Inbound::Invalid("response without id".to_string())
        }
        Ok(response) => Inbound::Response(response),
        Err(e) => match id {
            Some(id) => Inbound::MalformedResponse {
                id,
                reason: e.to_string(),
            },
            None => Inbound::Invalid(format!("malformed response: {}", e)),
        },
    }
}

/// Splits a byte stream into newline-delimited records, holding a trailing
/// partial record until the rest arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completed. Blank records are
    /// dropped and a trailing `\r` is stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let record: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&record[..record.len() - 1]);
            let text = text.trim_end_matches('\r');
            if !text.trim().is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }

    /// Bytes of the incomplete trailing record.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Flush the trailing record at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
