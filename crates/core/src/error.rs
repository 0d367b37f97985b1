//! Error types for ghstat-core
//!
//! A single error enum covers every failure the core can surface. Remote
//! failures are classified once, at the provider boundary, so the
//! resilience layer can decide what to retry and what to count.

use std::time::Duration;

use jiff::Timestamp;
use thiserror::Error;

/// Result type alias for ghstat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the provider, the resilience layer and the traversal
#[derive(Debug, Error)]
pub enum Error {
    /// The provider rejected the call until `reset_at`
    #[error("Rate limit exceeded (resets at {reset_at}): {message}")]
    RateLimited { reset_at: Timestamp, message: String },

    /// The provider answered with a transient "service unavailable"
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure (connection refused, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The circuit breaker is open and the call was not attempted
    #[error("Circuit open, retry after {}s", retry_after.as_secs())]
    CircuitOpen { retry_after: Duration },

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other remote API failure
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// File content was not valid UTF-8 and the decode policy is `Fail`
    #[error("Content of '{path}' is not valid UTF-8")]
    Decode { path: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Transient errors are retried by the retry policy
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Unavailable(_))
    }

    /// Transport errors are counted by the circuit breaker
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
