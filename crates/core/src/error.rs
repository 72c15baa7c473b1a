//! Core Error Types
//!
//! The error taxonomy shared across the workspace. Transport and protocol
//! failures, timeouts, capability failures and sandbox denials each get their
//! own variant so callers can decide whether a failure is local to one request
//! or fatal to a whole connection.
//!
//! The application crate wraps these in `AppError` together with its own
//! configuration and storage variants.

use thiserror::Error;

/// Message carried by every continuation rejected because its connection closed.
pub const CONNECTION_CLOSED: &str = "connection closed";

/// Core error type for the agent runtime workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Channel could not be opened, or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error envelope or malformed payload from a provider
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No response before the deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A capability failed while running
    #[error("Invocation error: {0}")]
    Invocation(String),

    /// Rejected by the execution sandbox
    #[error("Access denied: {0}")]
    SandboxDenied(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// The failure handed to every pending request when its connection goes away.
    pub fn closed() -> Self {
        Self::Connection(CONNECTION_CLOSED.to_string())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invocation error
    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::Invocation(msg.into())
    }

    /// Create a sandbox denial
    pub fn denied(msg: impl Into<String>) -> Self {
        Self::SandboxDenied(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for the bulk rejection issued when a connection closes.
    pub fn is_closed_connection(&self) -> bool {
        matches!(self, Self::Connection(msg) if msg == CONNECTION_CLOSED)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::SandboxDenied(_))
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
