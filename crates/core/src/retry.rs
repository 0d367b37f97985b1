//! Retry with server-supplied backoff
//!
//! Rate-limit and service-unavailable responses are retried a bounded number
//! of times. When the provider says when its limit resets, the wait runs
//! until that instant; otherwise a fixed minimum delay is used.

use std::time::Duration;

use jiff::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Retry policy settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Lower bound for every wait
    pub min_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            min_delay: Duration::from_secs(1),
        }
    }
}

/// State carried across the attempts of one logical call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Reset instant reported by the last rate-limit signal
    pub reset_at: Option<Timestamp>,
}

impl RetryContext {
    /// Record what the error tells us about when to come back
    pub fn observe(&mut self, error: &Error) {
        if let Error::RateLimited { reset_at, .. } = error {
            self.reset_at = Some(*reset_at);
        }
    }

    /// Wait before the next attempt: until the reset instant, at least `min_delay`
    pub fn delay(&self, min_delay: Duration) -> Duration {
        let until_reset = self
            .reset_at
            .map(|reset| {
                Duration::try_from(reset.duration_since(Timestamp::now())).unwrap_or(Duration::ZERO)
            })
            .unwrap_or(Duration::ZERO);
        until_reset.max(min_delay)
    }
}

/// Retry a fallible async operation on transient errors
///
/// `operation` is invoked once, then up to `config.max_retries` more times
/// while it fails with [`Error::is_transient`]. Other errors, including
/// [`Error::CircuitOpen`], are returned as-is. Cancellation is honoured
/// before each attempt and during each wait.
///
/// # Example
/// ```ignore
/// let entries = retry_with_reset(
///     &config,
///     &cancel,
///     || async { provider.list_directory("/").await },
/// ).await?;
/// ```
pub async fn retry_with_reset<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut context = RetryContext::default();
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt > config.max_retries || !e.is_transient() {
                    return Err(e);
                }

                context.observe(&e);
                let delay = context.delay(config.min_delay);
                tracing::info!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient error"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Builder for [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryBuilder {
    max_retries: u32,
    min_delay: Duration,
}

impl RetryBuilder {
    pub fn new() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            min_delay: defaults.min_delay,
        }
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    pub fn build(self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            min_delay: self.min_delay,
        }
    }
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
