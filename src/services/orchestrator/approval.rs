//! Approval Gates
//!
//! A risky batch is presented as one request and answered with one yes/no.
//! `ChannelApprovalGate` lets a caller outside the loop answer by request id;
//! `StaticApprovalGate` answers every request the same way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;

use super::events::PendingAction;

/// One decision request covering a whole batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub request_id: String,
    pub correlation_id: String,
    pub actions: Vec<PendingAction>,
}

/// Human-in-the-loop decision function for risky batches.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// true approves the whole batch, false refuses it
    async fn decide(&self, request: &ApprovalRequest) -> bool;
}

/// Gate with a fixed answer.
pub struct StaticApprovalGate {
    approve: bool,
}

impl StaticApprovalGate {
    pub fn approve_all() -> Self {
        Self { approve: true }
    }

    pub fn refuse_all() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl ApprovalGate for StaticApprovalGate {
    async fn decide(&self, _request: &ApprovalRequest) -> bool {
        self.approve
    }
}

/// Early decisions kept at most; the oldest is dropped beyond this
pub const MAX_EARLY_DECISIONS: usize = 256;

enum Slot {
    Waiting(oneshot::Sender<bool>),
    Decided { approved: bool, at: Instant },
}

/// Gate resolved out-of-band through `resolve(request_id, approved)`.
///
/// The loop emits the request as an event before it starts waiting, so a
/// decision may arrive first; it is kept until the gate asks for it or the
/// deadline passes. Requests left unanswered past the deadline are refused.
pub struct ChannelApprovalGate {
    slots: Mutex<HashMap<String, Slot>>,
    timeout: Duration,
}

impl ChannelApprovalGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Deliver a decision. Returns true when a waiting request was unblocked.
    pub async fn resolve(&self, request_id: &str, approved: bool) -> bool {
        let mut slots = self.slots.lock().await;
        match slots.remove(request_id) {
            Some(Slot::Waiting(tx)) => tx.send(approved).is_ok(),
            _ => {
                let now = Instant::now();
                self.prune_decided(&mut slots, now);
                slots.insert(request_id.to_string(), Slot::Decided { approved, at: now });
                false
            }
        }
    }

    /// Drop stale early decisions and make room for one more.
    fn prune_decided(&self, slots: &mut HashMap<String, Slot>, now: Instant) {
        slots.retain(|_, slot| match slot {
            Slot::Decided { at, .. } => now.duration_since(*at) < self.timeout,
            Slot::Waiting(_) => true,
        });

        let mut decided: Vec<(Instant, String)> = slots
            .iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Decided { at, .. } => Some((*at, id.clone())),
                Slot::Waiting(_) => None,
            })
            .collect();
        if decided.len() < MAX_EARLY_DECISIONS {
            return;
        }
        decided.sort();
        let excess = decided.len() + 1 - MAX_EARLY_DECISIONS;
        for (_, id) in decided.into_iter().take(excess) {
            slots.remove(&id);
        }
        tracing::debug!(dropped = excess, "Dropped oldest unclaimed approval decisions");
    }

    /// Decisions received for requests the gate has not asked about yet
    pub async fn early_decision_count(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Decided { .. }))
            .count()
    }

    /// Requests currently blocked on a decision
    pub async fn waiting_count(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Waiting(_)))
            .count()
    }

    /// Refuse everything still waiting and forget early decisions.
    pub async fn refuse_all_pending(&self) {
        let drained: Vec<Slot> = self.slots.lock().await.drain().map(|(_, slot)| slot).collect();
        for slot in drained {
            if let Slot::Waiting(tx) = slot {
                let _ = tx.send(false);
            }
        }
    }
}

#[async_trait]
impl ApprovalGate for ChannelApprovalGate {
    async fn decide(&self, request: &ApprovalRequest) -> bool {
        let rx = {
            let mut slots = self.slots.lock().await;
            if let Some(Slot::Decided { approved, at }) = slots.remove(&request.request_id) {
                if at.elapsed() < self.timeout {
                    return approved;
                }
            }
            let (tx, rx) = oneshot::channel();
            slots.insert(request.request_id.clone(), Slot::Waiting(tx));
            rx
        };

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(approved)) => approved,
            Ok(Err(_)) => false,
            Err(_) => {
                self.slots.lock().await.remove(&request.request_id);
                tracing::warn!(
                    request_id = %request.request_id,
                    correlation_id = %request.correlation_id,
                    "Approval request timed out; refusing batch"
                );
                false
            }
        }
    }
}
