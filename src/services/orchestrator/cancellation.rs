//! Turn Cancellation
//!
//! Cancellation flags keyed by correlation id. Cancellation is polled by the
//! loop; an invocation already running is allowed to finish.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct CancellationRegistry {
    tokens: DashMap<String, CancellationToken>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a new turn. Re-registering an id replaces its token.
    pub fn register(&self, correlation_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(correlation_id.to_string(), token.clone());
        token
    }

    /// Set the flag for a turn. Returns false for unknown ids.
    pub fn cancel(&self, correlation_id: &str) -> bool {
        match self.tokens.get(correlation_id) {
            Some(token) => {
                token.cancel();
                tracing::info!(correlation_id = %correlation_id, "Turn cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self, correlation_id: &str) -> bool {
        self.tokens
            .get(correlation_id)
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }

    pub fn remove(&self, correlation_id: &str) {
        self.tokens.remove(correlation_id);
    }

    /// Turns currently registered
    pub fn active(&self) -> Vec<String> {
        self.tokens.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn cancel_all(&self) {
        for entry in self.tokens.iter() {
            entry.value().cancel();
        }
    }
}
