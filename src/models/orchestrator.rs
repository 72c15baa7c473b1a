//! Turn Models
//!
//! States and outcomes of one conversational turn.

use serde::{Deserialize, Serialize};

use agent_runtime_llm::{Message, UsageStats};

/// Where the orchestration loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Generating,
    AwaitingApproval,
    Executing,
    Done,
}

/// Why a successful turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Generation produced no requested actions
    Answered,
    /// The approval gate refused a risky batch
    Refused,
    /// The turn's cancellation flag was set
    Cancelled,
}

/// Terminal outcome of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Success { reason: CompletionReason },
    /// Generation failed
    Error { message: String },
    /// The iteration bound was reached
    #[serde(rename_all = "camelCase")]
    Truncated { max_iterations: u32 },
}

impl TurnOutcome {
    pub fn answered() -> Self {
        Self::Success {
            reason: CompletionReason::Answered,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Everything a finished turn hands back to its caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub correlation_id: String,
    pub outcome: TurnOutcome,
    /// Seed transcript plus everything appended during the turn
    pub transcript: Vec<Message>,
    /// Completed generation steps
    pub iterations: u32,
    pub usage: UsageStats,
    /// Text of the last assistant message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
}
