//! Commissioner configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::env;
use crate::error::CommissionerError;

/// Configuration for a [`Commissioner`](crate::Commissioner).
///
/// # Example Configuration File
///
/// ```toml
/// max_workers = 4
/// external_call_timeout_ms = 120000
/// poll_interval_ms = 250
/// ```
///
/// # Examples
///
/// ```
/// use commissioner::CommissionerConfig;
///
/// let config = CommissionerConfig::from_toml("max_workers = 2").unwrap();
/// assert_eq!(config.max_workers, 2);
/// assert_eq!(config.external_call_timeout_ms, 600_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionerConfig {
    /// Number of tasks that may execute at the same time.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Upper bound on a single collaborator call, in milliseconds.
    /// Elapsing it fails the task with an external-call error.
    #[serde(default = "default_external_call_timeout")]
    pub external_call_timeout_ms: u64,

    /// How often [`wait_for_completion`](crate::Commissioner::wait_for_completion)
    /// re-reads the record, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_max_workers() -> usize {
    8
}

fn default_external_call_timeout() -> u64 {
    600_000 // 10 minutes
}

fn default_poll_interval() -> u64 {
    500
}

impl Default for CommissionerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            external_call_timeout_ms: default_external_call_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl CommissionerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CommissionerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommissionerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CommissionerError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CommissionerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for unset ones.
    ///
    /// - `COMMISSIONER_MAX_WORKERS`
    /// - `COMMISSIONER_EXTERNAL_CALL_TIMEOUT_MS`
    /// - `COMMISSIONER_POLL_INTERVAL_MS`
    ///
    /// # Errors
    ///
    /// Returns [`CommissionerError::Config`] if a variable is set but is not
    /// a positive integer.
    pub fn from_env() -> Result<Self, CommissionerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, CommissionerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, CommissionerError> {
            raw.trim()
                .parse()
                .map_err(|_| CommissionerError::Config(format!("{name} is not a number: {raw}")))
        }

        let mut config = Self::default();
        if let Some(raw) = lookup(env::MAX_WORKERS) {
            config.max_workers = parse(env::MAX_WORKERS, &raw)?;
        }
        if let Some(raw) = lookup(env::EXTERNAL_CALL_TIMEOUT_MS) {
            config.external_call_timeout_ms = parse(env::EXTERNAL_CALL_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(env::POLL_INTERVAL_MS) {
            config.poll_interval_ms = parse(env::POLL_INTERVAL_MS, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero worker counts and zero durations.
    pub fn validate(&self) -> Result<(), CommissionerError> {
        if self.max_workers == 0 {
            return Err(CommissionerError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.external_call_timeout_ms == 0 {
            return Err(CommissionerError::Config(
                "external_call_timeout_ms must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(CommissionerError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the worker pool size.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Sets the collaborator call timeout.
    pub fn with_external_call_timeout(mut self, timeout: Duration) -> Self {
        self.external_call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the completion poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The collaborator call timeout as a [`Duration`].
    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_millis(self.external_call_timeout_ms)
    }

    /// The completion poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
