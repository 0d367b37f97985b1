//! Circuit breaker
//!
//! Counts consecutive transport failures across all callers. Once the
//! threshold is reached the circuit opens and calls fail fast for the break
//! duration. The first call after that runs as a single half-open trial
//! whose outcome closes or re-opens the circuit.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive transport failures that open the circuit
    pub failure_threshold: u32,

    /// How long the circuit stays open before a trial call is allowed
    pub break_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            break_duration: Duration::from_secs(10),
        }
    }
}

/// Externally visible state of the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug)]
enum Phase {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen { trial_in_flight: bool },
}

/// Permission to perform one call, returned by [`CircuitBreaker::acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Trial,
}

/// Thread-safe circuit breaker state machine
///
/// The lock is only held for state transitions, never across the guarded call.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    /// Current state; an expired open circuit reports `HalfOpen`
    pub fn state(&self) -> CircuitState {
        let phase = self.lock();
        match &*phase {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { until } if Instant::now() >= *until => CircuitState::HalfOpen,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Run `operation` through the breaker
    ///
    /// Fails with [`Error::CircuitOpen`] without polling `operation` when the
    /// circuit is open or a half-open trial is already running.
    pub async fn call<T, Fut>(&self, operation: Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        let permit = self.acquire()?;
        let mut guard = TrialGuard {
            breaker: self,
            armed: permit == Permit::Trial,
        };

        let result = operation.await;
        guard.armed = false;

        match &result {
            Ok(_) => self.on_success(permit),
            Err(e) if e.is_transport() => self.on_failure(permit, e),
            Err(_) => self.on_neutral(permit),
        }
        result
    }

    fn acquire(&self) -> Result<Permit> {
        let mut phase = self.lock();
        let now = Instant::now();
        match &mut *phase {
            Phase::Closed { .. } => Ok(Permit::Normal),
            Phase::Open { until } => {
                let until = *until;
                if now >= until {
                    tracing::info!("Circuit half-open, allowing a trial call");
                    *phase = Phase::HalfOpen {
                        trial_in_flight: true,
                    };
                    Ok(Permit::Trial)
                } else {
                    Err(Error::CircuitOpen {
                        retry_after: until - now,
                    })
                }
            }
            Phase::HalfOpen { trial_in_flight } => {
                if *trial_in_flight {
                    Err(Error::CircuitOpen {
                        retry_after: Duration::ZERO,
                    })
                } else {
                    *trial_in_flight = true;
                    Ok(Permit::Trial)
                }
            }
        }
    }

    fn on_success(&self, permit: Permit) {
        let mut phase = self.lock();
        match &mut *phase {
            Phase::Closed { failures } => *failures = 0,
            Phase::HalfOpen { .. } if permit == Permit::Trial => {
                tracing::info!("Circuit closed after successful trial call");
                *phase = Phase::Closed { failures: 0 };
            }
            // A call admitted before the circuit opened; its result is stale.
            _ => {}
        }
    }

    fn on_failure(&self, permit: Permit, error: &Error) {
        let mut phase = self.lock();
        let until = Instant::now() + self.config.break_duration;
        match &mut *phase {
            Phase::Closed { failures } => {
                *failures += 1;
                if *failures >= self.config.failure_threshold {
                    tracing::warn!(
                        break_secs = self.config.break_duration.as_secs(),
                        failures = *failures,
                        error = %error,
                        "Circuit opened"
                    );
                    *phase = Phase::Open { until };
                }
            }
            Phase::HalfOpen { .. } if permit == Permit::Trial => {
                tracing::warn!(
                    break_secs = self.config.break_duration.as_secs(),
                    error = %error,
                    "Trial call failed, circuit re-opened"
                );
                *phase = Phase::Open { until };
            }
            _ => {}
        }
    }

    fn on_neutral(&self, permit: Permit) {
        if permit == Permit::Trial {
            self.release_trial();
        }
    }

    fn release_trial(&self) {
        let mut phase = self.lock();
        if let Phase::HalfOpen { trial_in_flight } = &mut *phase {
            *trial_in_flight = false;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Phase> {
        // The state is a plain enum, valid even if a holder panicked.
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

/// Frees the half-open trial slot if the trial future is dropped mid-flight
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.release_trial();
        }
    }
}
