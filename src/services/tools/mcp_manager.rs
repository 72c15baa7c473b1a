//! MCP Manager Service
//!
//! Owns the lifecycle of provider connections and keeps the registry in step:
//! connecting registers a provider's catalog, disconnecting removes it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;

use agent_runtime_tools::ToolRegistry;

use super::mcp_adapter::McpToolAdapter;
use super::mcp_client::McpClient;
use crate::models::mcp::{ConnectedServerInfo, McpServerConfig};
use crate::utils::error::{AppError, AppResult};

struct ConnectedServer {
    client: Arc<McpClient>,
    config: McpServerConfig,
    qualified_names: Vec<String>,
}

/// Holds a provider name for the duration of one connect attempt.
struct Reservation<'a> {
    connecting: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.connecting
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.name);
    }
}

/// Manages provider connections and their registered capabilities.
pub struct McpManager {
    servers: RwLock<HashMap<String, ConnectedServer>>,
    /// Names with a connect in progress
    connecting: Mutex<HashSet<String>>,
    request_timeout: Duration,
}

impl McpManager {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            connecting: Mutex::new(HashSet::new()),
            request_timeout,
        }
    }

    /// Claim a name that is neither connected nor being connected.
    async fn reserve(&self, server_name: &str) -> AppResult<Reservation<'_>> {
        let servers = self.servers.write().await;
        let mut connecting = self.connecting.lock().unwrap_or_else(|e| e.into_inner());
        if servers.contains_key(server_name) || !connecting.insert(server_name.to_string()) {
            return Err(AppError::validation(format!(
                "Provider '{}' is already connected",
                server_name
            )));
        }
        Ok(Reservation {
            connecting: &self.connecting,
            name: server_name.to_string(),
        })
    }

    /// Connect to a provider, fetch its catalog and register every entry.
    ///
    /// A provider that fails to connect or to list its catalog contributes
    /// nothing to the registry.
    pub async fn connect_server(
        &self,
        config: &McpServerConfig,
        registry: &ToolRegistry,
    ) -> AppResult<ConnectedServerInfo> {
        let server_name = config.name.clone();
        if server_name.contains(':') || server_name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "Invalid provider name '{}'",
                server_name
            )));
        }
        let _reservation = self.reserve(&server_name).await?;

        let client = Arc::new(McpClient::connect(config, self.request_timeout).await?);
        let protocol_version = client
            .server_info()
            .map(|info| info.protocol_version)
            .unwrap_or_default();

        let tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                client.disconnect().await;
                return Err(e.into());
            }
        };

        let mut tool_names = Vec::with_capacity(tools.len());
        let mut qualified_names = Vec::with_capacity(tools.len());
        for info in &tools {
            let adapter = McpToolAdapter::new(info, Arc::clone(&client));
            tool_names.push(info.name.clone());
            qualified_names.push(adapter.qualified_name().to_string());
            registry.register(Arc::new(adapter));
        }

        tracing::info!(
            provider = %server_name,
            tools = qualified_names.len(),
            "Registered provider catalog"
        );

        self.servers.write().await.insert(
            server_name.clone(),
            ConnectedServer {
                client,
                config: config.clone(),
                qualified_names: qualified_names.clone(),
            },
        );

        Ok(ConnectedServerInfo {
            server_name,
            tool_names,
            qualified_tool_names: qualified_names,
            protocol_version,
        })
    }

    /// Disconnect a provider and unregister its capabilities.
    pub async fn disconnect_server(&self, server_name: &str, registry: &ToolRegistry) -> AppResult<()> {
        let server = self.servers.write().await.remove(server_name).ok_or_else(|| {
            AppError::not_found(format!("Provider '{}' is not connected", server_name))
        })?;

        for name in &server.qualified_names {
            registry.unregister(name);
        }
        server.client.disconnect().await;
        Ok(())
    }

    /// Reconnect a provider with the configuration it was connected with,
    /// replacing its registered catalog.
    pub async fn reload_server(
        &self,
        server_name: &str,
        registry: &ToolRegistry,
    ) -> AppResult<ConnectedServerInfo> {
        let config = {
            let servers = self.servers.read().await;
            servers
                .get(server_name)
                .map(|s| s.config.clone())
                .ok_or_else(|| AppError::not_found(format!("Provider '{}' is not connected", server_name)))?
        };
        self.disconnect_server(server_name, registry).await?;
        self.connect_server(&config, registry).await
    }

    /// Connect every enabled provider; failures are logged and skipped.
    pub async fn connect_all(
        &self,
        configs: &[McpServerConfig],
        registry: &ToolRegistry,
    ) -> Vec<ConnectedServerInfo> {
        let mut connected = Vec::new();
        for config in configs.iter().filter(|c| c.enabled) {
            match self.connect_server(config, registry).await {
                Ok(info) => connected.push(info),
                Err(e) => {
                    tracing::warn!(provider = %config.name, error = %e, "Failed to connect provider");
                }
            }
        }
        connected
    }

    /// Disconnect every provider.
    pub async fn disconnect_all(&self, registry: &ToolRegistry) {
        let names: Vec<String> = self.servers.read().await.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.disconnect_server(&name, registry).await {
                tracing::warn!(provider = %name, error = %e, "Failed to disconnect provider");
            }
        }
    }

    /// Currently connected providers, sorted by name.
    pub async fn list_connected_servers(&self) -> Vec<ConnectedServerInfo> {
        let servers = self.servers.read().await;
        let mut list: Vec<ConnectedServerInfo> = servers
            .iter()
            .map(|(name, server)| ConnectedServerInfo {
                server_name: name.clone(),
                tool_names: server
                    .qualified_names
                    .iter()
                    .filter_map(|qn| McpToolAdapter::parse_qualified_name(qn).map(|(_, tool)| tool.to_string()))
                    .collect(),
                qualified_tool_names: server.qualified_names.clone(),
                protocol_version: server
                    .client
                    .server_info()
                    .map(|info| info.protocol_version)
                    .unwrap_or_default(),
            })
            .collect();
        list.sort_by(|a, b| a.server_name.cmp(&b.server_name));
        list
    }

    pub async fn is_connected(&self, server_name: &str) -> bool {
        self.servers.read().await.contains_key(server_name)
    }

    pub async fn connected_count(&self) -> usize {
        self.servers.read().await.len()
    }

    /// Client for a connected provider.
    pub async fn get_client(&self, server_name: &str) -> Option<Arc<McpClient>> {
        self.servers
            .read()
            .await
            .get(server_name)
            .map(|s| Arc::clone(&s.client))
    }
}
