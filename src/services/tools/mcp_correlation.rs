//! Request Correlation
//!
//! Each outbound request is assigned a fresh id and parked in a pending
//! table. The transport's reader resolves entries by id in whatever order
//! responses arrive; a connection loss rejects every entry at once.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;

use agent_runtime_core::{CoreError, CoreResult};

use super::mcp_protocol::{classify, Inbound, JsonRpcResponse};

type Continuation = oneshot::Sender<CoreResult<JsonRpcResponse>>;

/// Pending request table shared between a client and its transport reader.
pub struct PendingRequests {
    provider: String,
    pending: DashMap<u64, Continuation>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl PendingRequests {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Allocate an id and park a continuation for it.
    ///
    /// Fails once the table has been closed so no request can be left
    /// waiting on a dead connection.
    pub fn register(&self) -> CoreResult<(u64, oneshot::Receiver<CoreResult<JsonRpcResponse>>)> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::closed());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        // close_all may have drained the table between the check and the insert
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(CoreError::closed());
        }
        Ok((id, rx))
    }

    /// Deliver a response to the continuation registered under its id.
    /// Returns false when no such request is pending.
    pub fn resolve(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.numeric_id() else {
            return false;
        };
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(Ok(response));
                true
            }
            None => false,
        }
    }

    /// Reject one pending request.
    pub fn fail(&self, id: u64, error: CoreError) -> bool {
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Drop a pending request without completing it.
    pub fn forget(&self, id: u64) {
        self.pending.remove(&id);
    }

    /// Reject every pending request with a connection-closed error and refuse
    /// new registrations. Returns how many requests were rejected.
    pub fn close_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut rejected = 0;
        for id in ids {
            if self.fail(id, CoreError::closed()) {
                rejected += 1;
            }
        }
        if rejected > 0 {
            tracing::warn!(
                provider = %self.provider,
                rejected,
                "Connection closed with requests in flight"
            );
        }
        rejected
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of requests still awaiting a response.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for the response to `id`, giving up after `deadline`.
    ///
    /// On timeout the entry is removed so a late response is discarded.
    pub async fn wait(
        &self,
        id: u64,
        mut rx: oneshot::Receiver<CoreResult<JsonRpcResponse>>,
        deadline: Duration,
    ) -> CoreResult<JsonRpcResponse> {
        match tokio::time::timeout(deadline, &mut rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CoreError::closed()),
            Err(_) => {
                if self.pending.remove(&id).is_some() {
                    return Err(CoreError::timeout(format!(
                        "Provider '{}' did not answer request {} within {}s",
                        self.provider,
                        id,
                        deadline.as_secs_f64()
                    )));
                }
                // Resolved concurrently with the deadline
                match rx.try_recv() {
                    Ok(result) => result,
                    Err(_) => Err(CoreError::closed()),
                }
            }
        }
    }

    /// Route one inbound record. Malformed input is logged and skipped;
    /// it never tears the connection down.
    pub fn dispatch_text(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.dispatch(value),
            Err(e) => {
                tracing::warn!(
                    provider = %self.provider,
                    error = %e,
                    "Discarding malformed record: {}",
                    truncate_for_log(text)
                );
            }
        }
    }

    /// Route one inbound JSON value.
    pub fn dispatch(&self, value: Value) {
        match classify(value) {
            Inbound::Response(response) => {
                let id = response.id.clone();
                if !self.resolve(response) {
                    tracing::debug!(
                        provider = %self.provider,
                        id = ?id,
                        "Discarding response with no pending request"
                    );
                }
            }
            Inbound::Notification { method } => {
                tracing::debug!(provider = %self.provider, %method, "Ignoring provider notification");
            }
            Inbound::Request { method } => {
                tracing::debug!(provider = %self.provider, %method, "Ignoring provider-initiated request");
            }
            Inbound::MalformedResponse { id, reason } => {
                tracing::warn!(provider = %self.provider, id, "Malformed response: {}", reason);
                self.fail(
                    id,
                    CoreError::protocol(format!("Malformed response to request {}: {}", id, reason)),
                );
            }
            Inbound::Invalid(reason) => {
                tracing::warn!(provider = %self.provider, "Discarding invalid envelope: {}", reason);
            }
        }
    }
}

fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.len() <= LIMIT {
        return text.to_string();
    }
    let mut end = LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
