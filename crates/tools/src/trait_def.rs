//! Tool Trait and Registry
//!
//! Every capability, local or remote, implements `Tool`. The registry merges
//! them behind one `invoke(name, args, ctx)` contract that never fails: unknown
//! names, errors and panics all come back as error-flagged results so a single
//! failing action cannot abort orchestration.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use agent_runtime_core::{
    CapabilityDescriptor, CapabilityOrigin, CoreResult, InvocationResult, ToolContext,
};
use agent_runtime_llm::{ParameterSchema, ToolDefinition};

/// A named, schema-described action the agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry-wide unique name
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Where the implementation lives.
    fn origin(&self) -> CapabilityOrigin {
        CapabilityOrigin::Local
    }

    /// Read-only tools never reach the approval gate.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Run the tool. Errors are converted to error-flagged results by the registry.
    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult>;

    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema().to_json(),
            origin: self.origin(),
            risky: !self.is_read_only(),
        }
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

struct RegistryEntry {
    tool: Arc<dyn Tool>,
    /// Registration sequence; overwrites keep the original slot
    seq: u64,
}

/// Registry of available capabilities.
///
/// Shared by every conversation; all methods take `&self` so provider reloads
/// can register and unregister while turns are running.
pub struct ToolRegistry {
    tools: DashMap<String, RegistryEntry>,
    next_seq: AtomicU64,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register a tool, replacing any tool with the same name.
    ///
    /// Returns true when an existing registration was overwritten.
    pub fn register(&self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        match self.tools.entry(name) {
            Entry::Occupied(mut existing) => {
                tracing::warn!(tool = %existing.key(), "Overwriting existing tool registration");
                existing.get_mut().tool = tool;
                true
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(RegistryEntry { tool, seq });
                false
            }
        }
    }

    /// Unregister a tool by name. Returns the removed tool, or None if not found.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name).map(|(_, entry)| entry.tool)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| entry.tool.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptor of a registered tool.
    pub fn lookup(&self, name: &str) -> Option<CapabilityDescriptor> {
        self.get(name).map(|tool| tool.descriptor())
    }

    fn ordered(&self) -> Vec<Arc<dyn Tool>> {
        let mut entries: Vec<(u64, Arc<dyn Tool>)> = self
            .tools
            .iter()
            .map(|entry| (entry.seq, entry.tool.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, tool)| tool).collect()
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.ordered()
            .iter()
            .map(|tool| tool.name().to_string())
            .collect()
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        self.ordered().iter().map(|tool| tool.descriptor()).collect()
    }

    /// All tool definitions, suitable for sending to the generation capability.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.catalog_for(None)
    }

    /// Project a subset of the registry. `None` selects everything; names
    /// that are not registered are skipped.
    pub fn catalog_for(&self, names: Option<&[String]>) -> Vec<ToolDefinition> {
        self.ordered()
            .iter()
            .filter(|tool| names.map_or(true, |n| n.iter().any(|x| x == tool.name())))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Catalog of read-only tools only, for contexts where risky actions
    /// must not even be offered.
    pub fn read_only_catalog(&self) -> Vec<ToolDefinition> {
        self.ordered()
            .iter()
            .filter(|tool| tool.is_read_only())
            .map(|tool| tool.definition())
            .collect()
    }

    /// Names of the tools served by one provider.
    pub fn names_for_provider(&self, provider: &str) -> Vec<String> {
        self.ordered()
            .iter()
            .filter(|tool| tool.origin().provider() == Some(provider))
            .map(|tool| tool.name().to_string())
            .collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    ///
    /// Always returns a result: unknown names, tool errors and panics become
    /// error-flagged results.
    pub async fn invoke(&self, name: &str, args: Value, ctx: &ToolContext) -> InvocationResult {
        let Some(tool) = self.get(name) else {
            return InvocationResult::error(format!("Unknown tool: {}", name));
        };

        match AssertUnwindSafe(tool.execute(ctx, args)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::debug!(tool = %name, error = %e, "Tool invocation failed");
                InvocationResult::error(e.to_string())
            }
            Err(_) => {
                tracing::error!(tool = %name, "Tool panicked during invocation");
                InvocationResult::error(format!("Tool '{}' panicked during execution", name))
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type ToolHandler =
    dyn Fn(ToolContext, Value) -> BoxFuture<'static, CoreResult<InvocationResult>> + Send + Sync;

/// Closure-backed tool, for small local capabilities and tests.
pub struct FunctionTool {
    name: String,
    description: String,
    schema: ParameterSchema,
    read_only: bool,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ParameterSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolContext, Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = CoreResult<InvocationResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            read_only: false,
            handler: Arc::new(move |ctx, args| handler(ctx, args).boxed()),
        }
    }

    /// Mark the tool read-only (auto-approved).
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> ParameterSchema {
        self.schema.clone()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        (self.handler)(ctx.clone(), args).await
    }
}
