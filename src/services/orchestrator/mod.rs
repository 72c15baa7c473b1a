//! Orchestration
//!
//! The per-turn agentic loop and everything it consults: risk
//! classification, approval gates, cancellation flags and the ordered
//! progress events it emits.

pub mod agentic_loop;
pub mod approval;
pub mod cancellation;
pub mod events;
pub mod permissions;

pub use agentic_loop::{AgenticLoop, LoopConfig};
pub use approval::{ApprovalGate, ApprovalRequest, ChannelApprovalGate, StaticApprovalGate};
pub use cancellation::CancellationRegistry;
pub use events::{EventSink, ExecutedAction, PendingAction, TurnEvent};
pub use permissions::{
    classify_registered_risk, classify_tool_risk, needs_approval, risk_needs_approval,
    PermissionLevel, ToolRisk,
};
