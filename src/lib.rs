//! Agent Runtime
//!
//! A tool-calling agent runtime:
//! - Capability-provider protocol client over stdio and server-push transports
//! - Provider manager that registers remote capabilities as `mcp:{provider}:{name}`
//! - Built-in filesystem and shell capabilities routed through the sandbox
//! - The per-turn orchestration loop with approval gating and cancellation
//! - JSON configuration and the `AppState` composition root

pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::orchestrator::{CompletionReason, TurnOutcome, TurnResult, TurnState};
pub use models::settings::{RuntimeConfig, RuntimeConfigUpdate};
pub use services::orchestrator::{
    AgenticLoop, ApprovalGate, ApprovalRequest, ChannelApprovalGate, EventSink, LoopConfig,
    StaticApprovalGate, TurnEvent,
};
pub use state::AppState;
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
