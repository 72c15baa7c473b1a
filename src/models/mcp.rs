//! Provider Models
//!
//! Configuration and status shapes for capability providers reached over the
//! MCP-style JSON-RPC protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for connecting to one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    /// Provider name; also the namespace of its capabilities
    pub name: String,
    /// Transport type
    pub transport: McpTransportConfig,
    /// Disabled providers are skipped at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl McpServerConfig {
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: McpTransportConfig::Stdio {
                command: command.into(),
                args,
                env: HashMap::new(),
            },
            enabled: true,
        }
    }

    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: McpTransportConfig::Sse {
                url: url.into(),
                session_url: None,
                headers: HashMap::new(),
            },
            enabled: true,
        }
    }
}

/// Transport-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpTransportConfig {
    /// Spawn a child process and exchange newline-delimited envelopes
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Receive envelopes over a server-push event stream; requests go out
    /// as individual HTTP calls
    Sse {
        /// Event stream endpoint
        url: String,
        /// Optional session negotiation endpoint
        #[serde(default, rename = "sessionUrl", skip_serializing_if = "Option::is_none")]
        session_url: Option<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

impl McpTransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Sse { .. } => "sse",
        }
    }
}

/// Lifecycle state of a provider connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

/// Information reported by a provider during the handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerInfo {
    /// Provider name as configured
    pub name: String,
    /// Protocol version the provider answered with
    pub protocol_version: String,
    /// Provider capabilities
    pub capabilities: serde_json::Value,
    /// Provider-supplied identity metadata
    pub server_info: serde_json::Value,
}

/// One entry of a provider's capability catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolInfo {
    /// Name as reported by the provider
    pub name: String,
    pub description: String,
    /// JSON Schema for the input parameters
    pub input_schema: serde_json::Value,
    /// Provider this entry came from
    pub provider: String,
}

/// Summary returned after a provider is connected and its catalog registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedServerInfo {
    pub server_name: String,
    /// Names as reported by the provider
    pub tool_names: Vec<String>,
    /// Names as registered (`mcp:{server}:{tool}`)
    pub qualified_tool_names: Vec<String>,
    pub protocol_version: String,
}
