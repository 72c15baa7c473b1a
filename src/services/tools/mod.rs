//! Capability Services
//!
//! Built-in capabilities plus the client side of the capability-provider
//! protocol: envelopes, correlation, transports, clients, the connection
//! manager, and the adapter that registers remote capabilities.

pub mod impls;
pub mod mcp_adapter;
pub mod mcp_client;
pub mod mcp_correlation;
pub mod mcp_manager;
pub mod mcp_protocol;
pub mod mcp_sse;
pub mod mcp_transport;

pub use impls::register_builtin_tools;
pub use mcp_adapter::McpToolAdapter;
pub use mcp_client::McpClient;
pub use mcp_manager::McpManager;
