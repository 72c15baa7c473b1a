//! Agentic Loop
//!
//! Drives one conversational turn: generate, optionally ask for approval,
//! execute the requested actions through the registry, and repeat until the
//! model stops requesting actions, the gate refuses, the turn is cancelled,
//! generation fails, or the iteration bound is reached.
//!
//! The loop suspends only on the generation call, the approval wait and each
//! capability invocation. Every transition is mirrored by an event on the
//! turn's `EventSink`, and `turn-ended` is always the last one.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use agent_runtime_core::{OrchestratorContext, ToolContext};
use agent_runtime_llm::{LlmProvider, LlmRequestOptions, Message, ToolCall, UsageStats};
use agent_runtime_tools::ToolRegistry;

use super::approval::{ApprovalGate, ApprovalRequest};
use super::events::{EventSink, ExecutedAction, PendingAction, TurnEvent};
use super::permissions::{classify_registered_risk, risk_needs_approval, PermissionLevel};
use crate::models::orchestrator::{CompletionReason, TurnOutcome, TurnResult, TurnState};

/// Assistant notice appended when the iteration bound is reached
pub const TRUNCATION_NOTICE: &str =
    "Stopped: the maximum number of iterations for this turn was reached.";
/// Assistant notice appended when the turn is cancelled
pub const CANCELLATION_NOTICE: &str = "Cancelled: the turn was stopped before the next step.";
/// Observation appended when the approval gate refuses a batch
pub const REFUSAL_OBSERVATION: &str =
    "The user declined to approve the requested actions. None of them were executed.";

/// Per-turn loop settings
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_iterations: u32,
    pub system_prompt: Option<String>,
    /// Names of capabilities offered to the model; `None` offers everything
    pub catalog_scope: Option<Vec<String>>,
    pub permission_level: PermissionLevel,
    pub working_root: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            system_prompt: None,
            catalog_scope: None,
            permission_level: PermissionLevel::default(),
            working_root: None,
        }
    }
}

/// Mutable state of a running turn
struct TurnRun {
    ctx: OrchestratorContext,
    correlation_id: String,
    transcript: Vec<Message>,
    iterations: u32,
    usage: UsageStats,
    state: TurnState,
}

impl TurnRun {
    fn transition(&mut self, next: TurnState) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            from = ?self.state,
            to = ?next,
            "Turn state transition"
        );
        self.state = next;
    }
}

pub struct AgenticLoop {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    gate: Option<Arc<dyn ApprovalGate>>,
    config: LoopConfig,
}

impl AgenticLoop {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: LoopConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            gate: None,
            config,
        }
    }

    /// Route risky batches through `gate`. Without a gate every batch runs.
    pub fn with_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run one turn over `transcript` and return the extended transcript.
    pub async fn run(
        &self,
        correlation_id: &str,
        transcript: Vec<Message>,
        cancel: CancellationToken,
        sink: EventSink,
    ) -> TurnResult {
        let mut turn = TurnRun {
            ctx: OrchestratorContext::new(correlation_id, self.config.working_root.clone()),
            correlation_id: correlation_id.to_string(),
            transcript,
            iterations: 0,
            usage: UsageStats::default(),
            state: TurnState::Generating,
        };
        let catalog = self.registry.catalog_for(self.config.catalog_scope.as_deref());

        tracing::info!(
            correlation_id = %correlation_id,
            provider = self.provider.name(),
            model = self.provider.model(),
            tools = catalog.len(),
            "Turn started"
        );

        while turn.iterations < self.config.max_iterations {
            if cancel.is_cancelled() {
                return self.cancelled(turn, &sink).await;
            }

            // Generating
            turn.iterations += 1;
            let response = match self
                .provider
                .send_message(
                    turn.transcript.clone(),
                    self.config.system_prompt.clone(),
                    catalog.clone(),
                    LlmRequestOptions::default(),
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!(correlation_id = %correlation_id, error = %message, "Generation failed");
                    sink.emit(TurnEvent::Error {
                        correlation_id: turn.correlation_id.clone(),
                        message: message.clone(),
                    })
                    .await;
                    return self.finish(turn, TurnOutcome::Error { message }, &sink).await;
                }
            };
            turn.usage.accumulate(&response.usage);

            turn.transcript.push(Message::assistant_with_tools(
                response.content.clone(),
                &response.tool_calls,
            ));
            sink.emit(TurnEvent::Message {
                correlation_id: turn.correlation_id.clone(),
                iteration: turn.iterations,
                text: response.content.clone(),
                tool_calls: response.tool_calls.clone(),
            })
            .await;

            if response.tool_calls.is_empty() {
                return self
                    .finish(turn, TurnOutcome::answered(), &sink)
                    .await;
            }

            let risky = self.risky_actions(&response.tool_calls);
            if let Some(gate) = self.gate.as_ref().filter(|_| !risky.is_empty()) {
                turn.transition(TurnState::AwaitingApproval);
                if !self.request_approval(&turn, gate.as_ref(), risky, &sink).await {
                    turn.transcript.push(Message::user(REFUSAL_OBSERVATION));
                    return self
                        .finish(
                            turn,
                            TurnOutcome::Success {
                                reason: CompletionReason::Refused,
                            },
                            &sink,
                        )
                        .await;
                }
            }

            if cancel.is_cancelled() {
                return self.cancelled(turn, &sink).await;
            }

            turn.transition(TurnState::Executing);
            let results = self.execute_batch(&mut turn, &response.tool_calls).await;
            sink.emit(TurnEvent::ActionsExecuted {
                correlation_id: turn.correlation_id.clone(),
                iteration: turn.iterations,
                results,
            })
            .await;
            turn.transition(TurnState::Generating);
        }

        tracing::warn!(
            correlation_id = %correlation_id,
            max_iterations = self.config.max_iterations,
            "Iteration limit reached; truncating turn"
        );
        turn.transcript.push(Message::assistant(TRUNCATION_NOTICE));
        sink.emit(TurnEvent::Message {
            correlation_id: turn.correlation_id.clone(),
            iteration: turn.iterations,
            text: Some(TRUNCATION_NOTICE.to_string()),
            tool_calls: Vec::new(),
        })
        .await;
        let max_iterations = self.config.max_iterations;
        self.finish(turn, TurnOutcome::Truncated { max_iterations }, &sink)
            .await
    }

    /// Calls that need a decision at the configured permission level.
    /// A tool registered as read-only is treated like the allow-list.
    fn risky_actions(&self, calls: &[ToolCall]) -> Vec<PendingAction> {
        calls
            .iter()
            .filter_map(|call| {
                let declared_read_only = self
                    .registry
                    .lookup(&call.name)
                    .is_some_and(|descriptor| !descriptor.risky);
                let risk = classify_registered_risk(&call.name, declared_read_only);
                risk_needs_approval(risk, self.config.permission_level).then(|| PendingAction {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    risk,
                })
            })
            .collect()
    }

    async fn request_approval(
        &self,
        turn: &TurnRun,
        gate: &dyn ApprovalGate,
        actions: Vec<PendingAction>,
        sink: &EventSink,
    ) -> bool {
        let request = ApprovalRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            correlation_id: turn.correlation_id.clone(),
            actions,
        };
        sink.emit(TurnEvent::ApprovalRequest {
            correlation_id: request.correlation_id.clone(),
            request_id: request.request_id.clone(),
            actions: request.actions.clone(),
        })
        .await;

        let approved = gate.decide(&request).await;
        tracing::info!(
            correlation_id = %turn.correlation_id,
            request_id = %request.request_id,
            actions = request.actions.len(),
            approved,
            "Approval decided"
        );

        sink.emit(TurnEvent::ApprovalResult {
            correlation_id: request.correlation_id,
            request_id: request.request_id,
            approved,
        })
        .await;
        approved
    }

    /// Invoke every call in request order. Failures become observations.
    async fn execute_batch(&self, turn: &mut TurnRun, calls: &[ToolCall]) -> Vec<ExecutedAction> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let tool_ctx: ToolContext = turn.ctx.tool_context(call.id.clone());
            let arguments = match &call.arguments {
                Value::Null => Value::Object(Default::default()),
                other => other.clone(),
            };
            let outcome = self.registry.invoke(&call.name, arguments, &tool_ctx).await;
            if outcome.is_error {
                tracing::debug!(
                    correlation_id = %turn.correlation_id,
                    tool = %call.name,
                    call_id = %call.id,
                    "Action produced an error observation"
                );
            }

            turn.transcript
                .push(Message::tool_result(&call.id, outcome.to_text(), outcome.is_error));
            results.push(ExecutedAction {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content: outcome.content,
                is_error: outcome.is_error,
            });
        }
        results
    }

    async fn cancelled(&self, mut turn: TurnRun, sink: &EventSink) -> TurnResult {
        tracing::info!(correlation_id = %turn.correlation_id, "Turn cancelled");
        turn.transcript.push(Message::assistant(CANCELLATION_NOTICE));
        sink.emit(TurnEvent::Message {
            correlation_id: turn.correlation_id.clone(),
            iteration: turn.iterations,
            text: Some(CANCELLATION_NOTICE.to_string()),
            tool_calls: Vec::new(),
        })
        .await;
        self.finish(
            turn,
            TurnOutcome::Success {
                reason: CompletionReason::Cancelled,
            },
            sink,
        )
        .await
    }

    async fn finish(&self, mut turn: TurnRun, outcome: TurnOutcome, sink: &EventSink) -> TurnResult {
        turn.transition(TurnState::Done);
        sink.emit(TurnEvent::TurnEnded {
            correlation_id: turn.correlation_id.clone(),
            outcome: outcome.clone(),
            iterations: turn.iterations,
        })
        .await;
        tracing::info!(
            correlation_id = %turn.correlation_id,
            iterations = turn.iterations,
            outcome = ?outcome,
            "Turn ended"
        );

        let final_text = turn
            .transcript
            .iter()
            .rev()
            .find(|m| m.role == agent_runtime_llm::MessageRole::Assistant)
            .and_then(Message::text_content);

        TurnResult {
            correlation_id: turn.correlation_id,
            outcome,
            transcript: turn.transcript,
            iterations: turn.iterations,
            usage: turn.usage,
            final_text,
        }
    }
}
