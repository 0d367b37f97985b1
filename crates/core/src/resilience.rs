//! Resilience executor
//!
//! Composes the retry policy around the circuit breaker: every attempt the
//! retry loop makes is admitted (or refused) by the breaker, and an open
//! circuit is never retried. One executor is shared by all calls of a
//! traversal so the breaker sees the provider's health as a whole.

use tokio_util::sync::CancellationToken;

use crate::breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::config::ResilienceConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, retry_with_reset};

#[derive(Debug, Default)]
pub struct ResilienceExecutor {
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl ResilienceExecutor {
    pub fn new(retry: RetryConfig, breaker: BreakerConfig) -> Self {
        Self {
            retry,
            breaker: CircuitBreaker::new(breaker),
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.retry(), config.breaker())
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Execute `action` under retry, breaker and cancellation
    ///
    /// `action` is called once per attempt. A cancelled token fails the call
    /// with [`Error::Cancelled`] before any attempt is made, and aborts an
    /// attempt or a retry wait in progress.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        retry_with_reset(&self.retry, cancel, || {
            let attempt = self.breaker.call(action());
            async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(Error::Cancelled),
                    result = attempt => result,
                }
            }
        })
        .await
    }
}
