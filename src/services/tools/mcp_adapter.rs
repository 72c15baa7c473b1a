//! MCP Tool Adapter
//!
//! Wraps one provider capability as a `Tool`, so remote capabilities sit in
//! the registry next to built-in ones. Registered names are namespaced as
//! `mcp:{provider}:{tool}`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use agent_runtime_core::{
    CapabilityOrigin, CoreError, CoreResult, ExecutionContext, InvocationResult, ToolContext,
};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::Tool;

use super::mcp_client::McpClient;
use crate::models::mcp::McpToolInfo;

/// Prefix shared by every provider-backed capability name
pub const QUALIFIED_PREFIX: &str = "mcp";

/// Proxies `execute()` to the provider via `tools/call`.
pub struct McpToolAdapter {
    server_name: String,
    tool_name: String,
    qualified_name: String,
    description: String,
    input_schema: Value,
    client: Arc<McpClient>,
}

impl McpToolAdapter {
    pub fn new(info: &McpToolInfo, client: Arc<McpClient>) -> Self {
        Self {
            server_name: info.provider.clone(),
            tool_name: info.name.clone(),
            qualified_name: Self::qualify(&info.provider, &info.name),
            description: info.description.clone(),
            input_schema: info.input_schema.clone(),
            client,
        }
    }

    pub fn qualify(server_name: &str, tool_name: &str) -> String {
        format!("{}:{}:{}", QUALIFIED_PREFIX, server_name, tool_name)
    }

    /// Split `mcp:{server}:{tool}` into its parts. Tool names may themselves
    /// contain ':'.
    pub fn parse_qualified_name(name: &str) -> Option<(&str, &str)> {
        let mut parts = name.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(QUALIFIED_PREFIX), Some(server), Some(tool)) if !server.is_empty() && !tool.is_empty() => {
                Some((server, tool))
            }
            _ => None,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.qualified_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::from_json_schema(&self.input_schema)
    }

    fn origin(&self) -> CapabilityOrigin {
        CapabilityOrigin::Provider(self.server_name.clone())
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        tracing::debug!(
            tool = %self.qualified_name,
            correlation_id = %ctx.correlation_id(),
            "Forwarding invocation to provider"
        );
        match self.client.call_tool(&self.tool_name, args).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_timeout() => Err(e),
            Err(e) => Err(CoreError::connection(format!(
                "Capability unavailable: provider '{}' could not run '{}': {}",
                self.server_name, self.tool_name, e
            ))),
        }
    }
}
