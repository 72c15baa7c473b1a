//! Orchestration Loop Integration Tests
//!
//! Drives full turns with a scripted generation provider and local stub
//! capabilities, checking terminal states, transcript effects and the exact
//! event order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agent_runtime::models::orchestrator::{CompletionReason, TurnOutcome};
use agent_runtime::services::orchestrator::agentic_loop::{
    CANCELLATION_NOTICE, REFUSAL_OBSERVATION, TRUNCATION_NOTICE,
};
use agent_runtime::services::orchestrator::{
    AgenticLoop, ApprovalGate, ApprovalRequest, EventSink, LoopConfig, PermissionLevel,
    StaticApprovalGate, TurnEvent,
};
use agent_runtime::{AppState, RuntimeConfig};
use agent_runtime_core::{CoreError, InvocationResult};
use agent_runtime_llm::{
    LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent,
    ParameterSchema, ToolCall, ToolDefinition,
};
use agent_runtime_tools::{FunctionTool, ToolRegistry};

// ============================================================================
// Test doubles
// ============================================================================

/// Replays canned responses and records what it was shown.
struct ScriptedProvider {
    script: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    fallback: LlmResponse,
    seen_catalogs: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<LlmResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            fallback: LlmResponse::text("done", "scripted"),
            seen_catalogs: Mutex::new(Vec::new()),
        })
    }

    /// Requests `name` forever.
    fn looping(name: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: LlmResponse::with_tool_calls(
                vec![ToolCall::new("loop", name, json!({}))],
                "scripted",
            ),
            seen_catalogs: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn send_message(
        &self,
        _messages: Vec<Message>,
        _system: Option<String>,
        tools: Vec<ToolDefinition>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.seen_catalogs
            .lock()
            .unwrap()
            .push(tools.into_iter().map(|t| t.name).collect());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

fn echo_schema() -> ParameterSchema {
    let mut props = HashMap::new();
    props.insert("x".to_string(), ParameterSchema::string(Some("Text to echo")));
    ParameterSchema::object(Some("Echo arguments"), props, vec!["x".to_string()])
}

/// `echo(x) = x`, counting invocations
fn echo_tool(name: &str, calls: Arc<AtomicUsize>) -> Arc<FunctionTool> {
    Arc::new(echo_function(name, calls))
}

fn echo_function(name: &str, calls: Arc<AtomicUsize>) -> FunctionTool {
    FunctionTool::new(
        name,
        "Returns its argument",
        echo_schema(),
        move |_ctx, args: Value| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let x = args
                    .get("x")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CoreError::validation("x is required"))?;
                Ok::<_, CoreError>(InvocationResult::text(x))
            }
        },
    )
}

fn echo_call(id: &str, name: &str, x: &str) -> LlmResponse {
    LlmResponse::with_tool_calls(vec![ToolCall::new(id, name, json!({"x": x}))], "scripted")
}

async fn drain(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn kinds(events: &[TurnEvent]) -> Vec<&'static str> {
    events.iter().map(TurnEvent::kind).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_echo_turn_event_order() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("echo", Arc::clone(&calls)));
    let provider = ScriptedProvider::new(vec![
        echo_call("call-1", "echo", "a"),
        LlmResponse::text("The echo said a.", "scripted"),
    ]);
    let agent = AgenticLoop::new(provider, registry, LoopConfig::default());
    let (tx, rx) = mpsc::channel(64);

    let result = agent
        .run(
            "turn-echo",
            vec![Message::user("echo a please")],
            CancellationToken::new(),
            EventSink::new(tx),
        )
        .await;
    let events = drain(rx).await;

    assert_eq!(
        kinds(&events),
        vec!["message", "actions-executed", "message", "turn-ended"]
    );
    match &events[0] {
        TurnEvent::Message { tool_calls, .. } => {
            assert_eq!(tool_calls.len(), 1);
            assert_eq!(tool_calls[0].name, "echo");
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[1] {
        TurnEvent::ActionsExecuted { results, .. } => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].call_id, "call-1");
            assert_eq!(results[0].text(), "a");
            assert!(!results[0].is_error);
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[2] {
        TurnEvent::Message { text, tool_calls, .. } => {
            assert_eq!(text.as_deref(), Some("The echo said a."));
            assert!(tool_calls.is_empty());
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[3] {
        TurnEvent::TurnEnded { outcome, iterations, .. } => {
            assert_eq!(*outcome, TurnOutcome::answered());
            assert_eq!(*iterations, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(events.iter().all(|e| e.correlation_id() == "turn-echo"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.iterations, 2);

    // The observation is tagged with its originating call id
    let observation = result
        .transcript
        .iter()
        .find(|m| !m.tool_result_ids().is_empty())
        .unwrap();
    assert_eq!(observation.tool_result_ids(), vec!["call-1"]);
}

#[tokio::test]
async fn test_answer_without_actions_takes_one_iteration() {
    let provider = ScriptedProvider::new(vec![LlmResponse::text("Hello!", "scripted")]);
    let agent = AgenticLoop::new(provider, Arc::new(ToolRegistry::new()), LoopConfig::default());

    let result = agent
        .run("t", vec![Message::user("hi")], CancellationToken::new(), EventSink::disabled())
        .await;

    assert_eq!(result.outcome, TurnOutcome::answered());
    assert_eq!(result.iterations, 1);
    assert_eq!(result.final_text.as_deref(), Some("Hello!"));
}

#[tokio::test]
async fn test_iteration_limit_truncates_once() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("echo", Arc::clone(&calls)));
    let provider = ScriptedProvider::looping("echo");
    let config = LoopConfig {
        max_iterations: 4,
        ..LoopConfig::default()
    };
    let agent = AgenticLoop::new(provider, registry, config);
    let (tx, rx) = mpsc::channel(64);

    let result = agent
        .run("t", vec![Message::user("loop")], CancellationToken::new(), EventSink::new(tx))
        .await;
    let events = drain(rx).await;

    assert_eq!(result.outcome, TurnOutcome::Truncated { max_iterations: 4 });
    assert_eq!(result.iterations, 4);
    let notices = result
        .transcript
        .iter()
        .filter(|m| m.text_content().as_deref() == Some(TRUNCATION_NOTICE))
        .count();
    assert_eq!(notices, 1);
    assert_eq!(kinds(&events).last(), Some(&"turn-ended"));
}

#[tokio::test]
async fn test_refused_batch_runs_nothing() {
    let registry = Arc::new(ToolRegistry::new());
    let safe_calls = Arc::new(AtomicUsize::new(0));
    let risky_calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("Grep", Arc::clone(&safe_calls)));
    registry.register(echo_tool("Bash", Arc::clone(&risky_calls)));
    let provider = ScriptedProvider::new(vec![LlmResponse::with_tool_calls(
        vec![
            ToolCall::new("c1", "Grep", json!({"x": "a"})),
            ToolCall::new("c2", "Bash", json!({"x": "b"})),
        ],
        "scripted",
    )]);
    let agent = AgenticLoop::new(provider, registry, LoopConfig::default())
        .with_gate(Arc::new(StaticApprovalGate::refuse_all()));
    let (tx, rx) = mpsc::channel(64);

    let result = agent
        .run("t", vec![Message::user("go")], CancellationToken::new(), EventSink::new(tx))
        .await;
    let events = drain(rx).await;

    assert_eq!(
        result.outcome,
        TurnOutcome::Success {
            reason: CompletionReason::Refused
        }
    );
    assert_eq!(safe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(risky_calls.load(Ordering::SeqCst), 0);
    let refusals = result
        .transcript
        .iter()
        .filter(|m| m.text_content().as_deref() == Some(REFUSAL_OBSERVATION))
        .count();
    assert_eq!(refusals, 1);

    assert_eq!(
        kinds(&events),
        vec!["message", "approval-request", "approval-result", "turn-ended"]
    );
    // Only the risky action is surfaced to the gate
    match &events[1] {
        TurnEvent::ApprovalRequest { actions, .. } => {
            assert_eq!(actions.len(), 1);
            assert_eq!(actions[0].name, "Bash");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_declared_read_only_tool_skips_gate() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(Arc::new(echo_function("Lookup", Arc::clone(&calls)).read_only()));
    assert!(!registry.lookup("Lookup").unwrap().risky);
    let provider = ScriptedProvider::new(vec![
        echo_call("c1", "Lookup", "found"),
        LlmResponse::text("looked it up", "scripted"),
    ]);
    let config = LoopConfig {
        permission_level: PermissionLevel::Strict,
        ..LoopConfig::default()
    };
    let agent = AgenticLoop::new(provider, registry, config)
        .with_gate(Arc::new(StaticApprovalGate::refuse_all()));
    let (tx, rx) = mpsc::channel(64);

    let result = agent
        .run("t", vec![Message::user("go")], CancellationToken::new(), EventSink::new(tx))
        .await;
    let events = drain(rx).await;

    assert_eq!(result.outcome, TurnOutcome::answered());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        kinds(&events),
        vec!["message", "actions-executed", "message", "turn-ended"]
    );
}

#[tokio::test]
async fn test_missing_gate_auto_approves() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("Bash", Arc::clone(&calls)));
    let provider = ScriptedProvider::new(vec![
        echo_call("c1", "Bash", "ok"),
        LlmResponse::text("ran it", "scripted"),
    ]);
    let agent = AgenticLoop::new(provider, registry, LoopConfig::default());
    let (tx, rx) = mpsc::channel(64);

    let result = agent
        .run("t", vec![Message::user("go")], CancellationToken::new(), EventSink::new(tx))
        .await;
    let events = drain(rx).await;

    assert_eq!(result.outcome, TurnOutcome::answered());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!kinds(&events).contains(&"approval-request"));
}

#[tokio::test]
async fn test_strict_level_gates_writes() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("Write", Arc::clone(&calls)));
    let provider = ScriptedProvider::new(vec![echo_call("c1", "Write", "x")]);

    let config = LoopConfig {
        permission_level: PermissionLevel::Strict,
        ..LoopConfig::default()
    };
    let agent = AgenticLoop::new(provider, Arc::clone(&registry), config)
        .with_gate(Arc::new(StaticApprovalGate::refuse_all()));
    let result = agent
        .run("t", vec![Message::user("go")], CancellationToken::new(), EventSink::disabled())
        .await;
    assert!(matches!(
        result.outcome,
        TurnOutcome::Success {
            reason: CompletionReason::Refused
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Approves, but cancels the turn while deciding
struct CancellingGate {
    token: CancellationToken,
}

#[async_trait]
impl ApprovalGate for CancellingGate {
    async fn decide(&self, _request: &ApprovalRequest) -> bool {
        self.token.cancel();
        true
    }
}

#[tokio::test]
async fn test_cancellation_checked_before_execute() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("Bash", Arc::clone(&calls)));
    let provider = ScriptedProvider::new(vec![echo_call("c1", "Bash", "x")]);
    let token = CancellationToken::new();
    let agent = AgenticLoop::new(provider, registry, LoopConfig::default()).with_gate(Arc::new(
        CancellingGate {
            token: token.clone(),
        },
    ));
    let (tx, rx) = mpsc::channel(64);

    let result = agent
        .run("t", vec![Message::user("go")], token, EventSink::new(tx))
        .await;
    let events = drain(rx).await;

    assert_eq!(
        result.outcome,
        TurnOutcome::Success {
            reason: CompletionReason::Cancelled
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.final_text.as_deref(), Some(CANCELLATION_NOTICE));
    assert_eq!(
        kinds(&events),
        vec!["message", "approval-request", "approval-result", "message", "turn-ended"]
    );
    match &events[3] {
        TurnEvent::Message { text, tool_calls, .. } => {
            assert_eq!(text.as_deref(), Some(CANCELLATION_NOTICE));
            assert!(tool_calls.is_empty());
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_action_is_observation_not_abort() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("echo", Arc::clone(&calls)));
    let provider = ScriptedProvider::new(vec![
        LlmResponse::with_tool_calls(
            vec![
                ToolCall::new("c1", "echo", json!({})),
                ToolCall::new("c2", "echo", json!({"x": "second"})),
            ],
            "scripted",
        ),
        LlmResponse::text("recovered", "scripted"),
    ]);
    let agent = AgenticLoop::new(provider, registry, LoopConfig::default());

    let result = agent
        .run("t", vec![Message::user("go")], CancellationToken::new(), EventSink::disabled())
        .await;

    assert_eq!(result.outcome, TurnOutcome::answered());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Observations follow request order
    let results: Vec<(String, bool)> = result
        .transcript
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|c| match c {
            MessageContent::ToolResult {
                tool_use_id,
                is_error,
                ..
            } => Some((tool_use_id.clone(), is_error.unwrap_or(false))),
            _ => None,
        })
        .collect();
    assert_eq!(
        results,
        vec![("c1".to_string(), true), ("c2".to_string(), false)]
    );
}

#[tokio::test]
async fn test_catalog_scope_limits_offered_tools() {
    let registry = Arc::new(ToolRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(echo_tool("echo", Arc::clone(&calls)));
    registry.register(echo_tool("Bash", Arc::clone(&calls)));
    let provider = ScriptedProvider::new(vec![LlmResponse::text("ok", "scripted")]);
    let config = LoopConfig {
        catalog_scope: Some(vec!["echo".to_string()]),
        ..LoopConfig::default()
    };
    let agent = AgenticLoop::new(Arc::clone(&provider) as Arc<dyn LlmProvider>, registry, config);

    agent
        .run("t", vec![Message::user("go")], CancellationToken::new(), EventSink::disabled())
        .await;

    let seen = provider.seen_catalogs.lock().unwrap().clone();
    assert_eq!(seen, vec![vec!["echo".to_string()]]);
}

#[tokio::test]
async fn test_app_state_channel_approval_flow() {
    let provider = ScriptedProvider::new(vec![
        echo_call("c1", "echo", "approved"),
        LlmResponse::text("finished", "scripted"),
    ]);
    let state = Arc::new(
        AppState::new(RuntimeConfig::default())
            .with_provider(provider)
            .with_channel_approvals(Duration::from_secs(5)),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    // Unknown to the allow-list, so it is Dangerous and needs approval
    state.registry().register(echo_tool("echo", Arc::clone(&calls)));

    let (tx, mut rx) = mpsc::channel(64);
    let turn = {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state
                .run_turn("turn-approval", vec![Message::user("go")], Some(tx))
                .await
        })
    };

    let mut kinds_seen = Vec::new();
    while let Some(event) = rx.recv().await {
        kinds_seen.push(event.kind());
        if let TurnEvent::ApprovalRequest { request_id, .. } = &event {
            state.resolve_approval(request_id, true).await;
        }
    }
    let result = turn.await.unwrap().unwrap();

    assert_eq!(result.outcome, TurnOutcome::answered());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        kinds_seen,
        vec![
            "message",
            "approval-request",
            "approval-result",
            "actions-executed",
            "message",
            "turn-ended"
        ]
    );
    assert!(!state.cancel_turn("turn-approval"));
}
