//! Turn Events
//!
//! Ordered progress events produced by the orchestration loop. Event order
//! equals transition order; consumers read them from an mpsc channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use agent_runtime_core::ContentPart;
use agent_runtime_llm::ToolCall;

use super::permissions::ToolRisk;
use crate::models::orchestrator::TurnOutcome;

/// One risky action presented to the approval gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
    pub risk: ToolRisk,
}

/// Observation produced by one executed action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedAction {
    pub call_id: String,
    pub name: String,
    pub content: Vec<ContentPart>,
    pub is_error: bool,
}

impl ExecutedAction {
    /// Text parts joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Progress event emitted by the orchestration loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TurnEvent {
    /// A generation step produced a message
    #[serde(rename_all = "camelCase")]
    Message {
        correlation_id: String,
        iteration: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// A risky batch awaits a decision
    #[serde(rename_all = "camelCase")]
    ApprovalRequest {
        correlation_id: String,
        request_id: String,
        actions: Vec<PendingAction>,
    },
    #[serde(rename_all = "camelCase")]
    ApprovalResult {
        correlation_id: String,
        request_id: String,
        approved: bool,
    },
    /// One batch of actions finished
    #[serde(rename_all = "camelCase")]
    ActionsExecuted {
        correlation_id: String,
        iteration: u32,
        results: Vec<ExecutedAction>,
    },
    #[serde(rename_all = "camelCase")]
    TurnEnded {
        correlation_id: String,
        outcome: TurnOutcome,
        iterations: u32,
    },
    /// Generation failed; always followed by `TurnEnded`
    #[serde(rename_all = "camelCase")]
    Error {
        correlation_id: String,
        message: String,
    },
}

impl TurnEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::ApprovalRequest { .. } => "approval-request",
            Self::ApprovalResult { .. } => "approval-result",
            Self::ActionsExecuted { .. } => "actions-executed",
            Self::TurnEnded { .. } => "turn-ended",
            Self::Error { .. } => "error",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Message { correlation_id, .. }
            | Self::ApprovalRequest { correlation_id, .. }
            | Self::ApprovalResult { correlation_id, .. }
            | Self::ActionsExecuted { correlation_id, .. }
            | Self::TurnEnded { correlation_id, .. }
            | Self::Error { correlation_id, .. } => correlation_id,
        }
    }
}

/// Sending half of a turn's event stream. A dropped receiver is ignored so
/// the loop always runs to completion.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<TurnEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<TurnEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                tracing::debug!("Turn event receiver dropped");
            }
        }
    }
}
