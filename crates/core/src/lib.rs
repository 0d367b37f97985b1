//! ghstat-core: Core library for the ghstat repository statistics tool
//!
//! This crate provides:
//! - The `ContentProvider` trait a remote repository backend implements
//! - A resilience executor (retry with server-supplied backoff, circuit breaker)
//! - Eager and lazy traversal of the remote tree with an extension filter
//! - A lock-free letter frequency aggregator
//! - Configuration loading
//!
//! It does not depend on any particular hosting API; the GitHub backend
//! lives in `ghstat-github`.

pub mod analyzer;
pub mod breaker;
pub mod config;
pub mod error;
pub mod extensions;
pub mod frequency;
pub mod resilience;
pub mod retry;
pub mod traits;
pub mod walker;

pub use analyzer::RepoAnalyzer;
pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use config::{Config, ConfigManager, GitHubConfig, ResilienceConfig, TraversalConfig};
pub use error::{Error, Result};
pub use extensions::{AllowedExtensions, DEFAULT_EXTENSIONS};
pub use frequency::{FrequencyReport, LetterCount, LetterFrequencies};
pub use resilience::ResilienceExecutor;
pub use retry::{RetryBuilder, RetryConfig, RetryContext, retry_with_reset};
pub use traits::{ContentEntry, ContentKind, ContentProvider};
pub use walker::{DecodePolicy, FileContent, ROOT, RepoWalker, WalkOptions, default_parallelism};

pub use tokio_util::sync::CancellationToken;
