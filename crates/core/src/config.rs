//! Configuration management
//!
//! Configuration is read from `config.toml` in the ghstat config directory.
//! A missing file is not an error; every field has a default except the
//! repository coordinates, which `validate` checks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breaker::BreakerConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryBuilder, RetryConfig};
use crate::walker::{DecodePolicy, WalkOptions};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "GHSTAT_CONFIG_DIR";

/// Environment variable overriding the access token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub resilience: ResilienceConfig,
    pub traversal: TraversalConfig,
}

/// Repository coordinates and client identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,

    /// Personal access token; raises the API rate limit when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub api_url: String,
    pub product_name: String,
    pub product_version: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: None,
            api_url: "https://api.github.com".to_string(),
            product_name: "ghstat".to_string(),
            product_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Retry and circuit breaker tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub max_retries: u32,
    pub min_retry_delay_secs: u64,
    pub breaker_threshold: u32,
    pub break_duration_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            min_retry_delay_secs: 1,
            breaker_threshold: 2,
            break_duration_secs: 10,
        }
    }
}

impl ResilienceConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryBuilder::new()
            .max_retries(self.max_retries)
            .min_delay(Duration::from_secs(self.min_retry_delay_secs))
            .build()
    }

    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_threshold,
            break_duration: Duration::from_secs(self.break_duration_secs),
        }
    }
}

/// Traversal tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Maximum outstanding remote calls; unset means half the CPUs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,

    pub decode: DecodePolicy,
}

impl TraversalConfig {
    pub fn walk_options(&self) -> WalkOptions {
        let mut options = WalkOptions::default();
        if let Some(n) = self.parallelism {
            options.parallelism = n.max(1);
        }
        options.decode = self.decode;
        options
    }
}

impl Config {
    /// Check the fields the traversal cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.github.owner.trim().is_empty() {
            return Err(Error::Config("github.owner is not set".to_string()));
        }
        if self.github.repo.trim().is_empty() {
            return Err(Error::Config("github.repo is not set".to_string()));
        }
        if self.resilience.breaker_threshold == 0 {
            return Err(Error::Config(
                "resilience.breaker_threshold must be at least 1".to_string(),
            ));
        }
        if self.traversal.parallelism == Some(0) {
            return Err(Error::Config(
                "traversal.parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locates and loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `$GHSTAT_CONFIG_DIR` or the platform config directory
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?
                .join("ghstat"),
        };
        Ok(Self::with_dir(dir))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file, falling back to defaults when it does not exist
    ///
    /// `GITHUB_TOKEN` takes precedence over the token in the file.
    pub fn load(&self) -> Result<Config> {
        let mut config = if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            Config::default()
        };

        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.trim().is_empty()
        {
            config.github.token = Some(token);
        }

        Ok(config)
    }
}
