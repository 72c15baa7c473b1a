//! Application State
//!
//! Composition root. Owns the capability registry, the provider manager,
//! turn cancellation flags and the optional approval gate, and hands them by
//! reference to every turn. Nothing here is process-global.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use agent_runtime_llm::{LlmProvider, Message, ToolDefinition};
use agent_runtime_tools::ToolRegistry;

use crate::models::mcp::ConnectedServerInfo;
use crate::models::orchestrator::TurnResult;
use crate::models::settings::RuntimeConfig;
use crate::services::orchestrator::{
    AgenticLoop, ApprovalGate, CancellationRegistry, ChannelApprovalGate, EventSink, LoopConfig,
    TurnEvent,
};
use crate::services::tools::{register_builtin_tools, McpManager};
use crate::utils::error::{AppError, AppResult};

/// Runtime state shared by every conversation
pub struct AppState {
    config: RwLock<RuntimeConfig>,
    registry: Arc<ToolRegistry>,
    mcp: McpManager,
    cancellations: CancellationRegistry,
    provider: RwLock<Option<Arc<dyn LlmProvider>>>,
    /// Gate consulted for risky batches; absent means auto-approve
    gate: Option<Arc<dyn ApprovalGate>>,
    /// Set when the gate is answered through `resolve_approval`
    channel_gate: Option<Arc<ChannelApprovalGate>>,
    initialized: RwLock<bool>,
}

impl AppState {
    /// Create an uninitialized state for `config`
    pub fn new(config: RuntimeConfig) -> Self {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        Self {
            config: RwLock::new(config),
            registry: Arc::new(ToolRegistry::new()),
            mcp: McpManager::new(request_timeout),
            cancellations: CancellationRegistry::new(),
            provider: RwLock::new(None),
            gate: None,
            channel_gate: None,
            initialized: RwLock::new(false),
        }
    }

    /// Use the generation backend `provider` for every turn
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = RwLock::new(Some(provider));
        self
    }

    /// Route risky batches through a fixed gate
    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = Some(gate);
        self.channel_gate = None;
        self
    }

    /// Route risky batches through a gate answered by `resolve_approval`
    pub fn with_channel_approvals(mut self, timeout: Duration) -> Self {
        let gate = Arc::new(ChannelApprovalGate::new(timeout));
        self.gate = Some(Arc::clone(&gate) as Arc<dyn ApprovalGate>);
        self.channel_gate = Some(gate);
        self
    }

    /// Same as `with_channel_approvals`, with the configured deadline
    pub fn with_configured_approvals(mut self) -> Self {
        let timeout = Duration::from_secs(self.config.get_mut().approval_timeout_secs);
        self.with_channel_approvals(timeout)
    }

    /// Register built-in capabilities and connect enabled providers.
    ///
    /// Provider failures are logged and skipped; the runtime keeps going
    /// with whatever connected. Returns the connected providers.
    pub async fn initialize(&self) -> AppResult<Vec<ConnectedServerInfo>> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(self.mcp.list_connected_servers().await);
        }

        let config = self.config.read().await.clone();
        config.validate().map_err(AppError::validation)?;

        register_builtin_tools(
            &self.registry,
            Duration::from_secs(config.command_timeout_secs),
        );
        let connected = self.mcp.connect_all(&config.providers, &self.registry).await;

        tracing::info!(
            tools = self.registry.len(),
            providers = connected.len(),
            "Runtime initialized"
        );
        *initialized = true;
        Ok(connected)
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Run one turn. Events stream to `events` when given.
    pub async fn run_turn(
        &self,
        correlation_id: &str,
        transcript: Vec<Message>,
        events: Option<mpsc::Sender<TurnEvent>>,
    ) -> AppResult<TurnResult> {
        let provider = self
            .provider
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::config("No generation provider configured"))?;

        let config = self.config.read().await.clone();
        let loop_config = LoopConfig {
            max_iterations: config.max_iterations,
            system_prompt: config.system_prompt,
            catalog_scope: None,
            permission_level: config.permission_level,
            working_root: config.working_root,
        };

        let mut agent = AgenticLoop::new(provider, Arc::clone(&self.registry), loop_config);
        if let Some(gate) = &self.gate {
            agent = agent.with_gate(Arc::clone(gate));
        }

        let sink = events.map(EventSink::new).unwrap_or_else(EventSink::disabled);
        let cancel = self.cancellations.register(correlation_id);
        let result = agent.run(correlation_id, transcript, cancel, sink).await;
        self.cancellations.remove(correlation_id);
        Ok(result)
    }

    /// Flag a running turn for cancellation. Returns false for unknown ids.
    pub fn cancel_turn(&self, correlation_id: &str) -> bool {
        self.cancellations.cancel(correlation_id)
    }

    /// Answer a pending approval request. Returns false when approvals are
    /// not resolved out-of-band or no turn was waiting on `request_id` yet.
    pub async fn resolve_approval(&self, request_id: &str, approved: bool) -> bool {
        match &self.channel_gate {
            Some(gate) => gate.resolve(request_id, approved).await,
            None => false,
        }
    }

    /// Cancel running turns, refuse pending approvals and disconnect every
    /// provider.
    pub async fn shutdown(&self) {
        self.cancellations.cancel_all();
        if let Some(gate) = &self.channel_gate {
            gate.refuse_all_pending().await;
        }
        self.mcp.disconnect_all(&self.registry).await;
        tracing::info!("Runtime shut down");
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn mcp(&self) -> &McpManager {
        &self.mcp
    }

    /// Full catalog currently offered to generation
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub async fn config(&self) -> RuntimeConfig {
        self.config.read().await.clone()
    }
}
