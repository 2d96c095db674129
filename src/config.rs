//! Configuration Module
//!
//! Handles loading and validating cache wrapper configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Backend Kind ==
/// Which backing store the demo binary connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// A Redis server reached through the connection string
    Redis,
    /// The in-process store, useful without a running server
    Memory,
}

impl CacheBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Some(CacheBackend::Redis),
            "memory" => Some(CacheBackend::Memory),
            _ => None,
        }
    }
}

/// Cache wrapper configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing store kind
    pub backend: CacheBackend,
    /// Redis connection string (`redis://`, `rediss://` or `unix://`)
    pub connection_string: String,
    /// Whether the connection applies the retry settings below
    pub retry_on_connection_failed: bool,
    /// Number of reconnect attempts
    pub connect_retry: usize,
    /// Base backoff between attempts in milliseconds
    pub delta_backoff_ms: u64,
    /// Upper bound of the backoff in milliseconds
    pub max_delta_backoff_ms: u64,
    /// Connection establishment timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Sliding expiration in seconds used when a caller supplies no policy
    pub default_sliding_secs: u64,
    /// Expired entry purge interval in seconds (memory backend only)
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_CONNECTION_STRING` - Redis URL (default: redis://127.0.0.1:6379)
    /// - `REDIS_RETRY_ON_CONNECTION_FAILED` - Enable retry settings (default: false)
    /// - `REDIS_CONNECT_RETRY` - Reconnect attempts (default: 3)
    /// - `REDIS_DELTA_BACKOFF_MS` - Base backoff in ms (default: 1000)
    /// - `REDIS_MAX_DELTA_BACKOFF_MS` - Max backoff in ms (default: 10000)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout in ms (default: 5000)
    /// - `CACHE_DEFAULT_SLIDING_SECS` - Default sliding expiration (default: 10800)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| CacheBackend::parse(&v))
                .unwrap_or(defaults.backend),
            connection_string: env::var("REDIS_CONNECTION_STRING")
                .unwrap_or(defaults.connection_string),
            retry_on_connection_failed: parse_env("REDIS_RETRY_ON_CONNECTION_FAILED")
                .unwrap_or(defaults.retry_on_connection_failed),
            connect_retry: parse_env("REDIS_CONNECT_RETRY").unwrap_or(defaults.connect_retry),
            delta_backoff_ms: parse_env("REDIS_DELTA_BACKOFF_MS")
                .unwrap_or(defaults.delta_backoff_ms),
            max_delta_backoff_ms: parse_env("REDIS_MAX_DELTA_BACKOFF_MS")
                .unwrap_or(defaults.max_delta_backoff_ms),
            connect_timeout_ms: parse_env("REDIS_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout_ms),
            default_sliding_secs: parse_env("CACHE_DEFAULT_SLIDING_SECS")
                .unwrap_or(defaults.default_sliding_secs),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    // == Validate ==
    /// Checks the settings for consistency, collecting every failure into one message.
    pub fn validate(&self) -> Result<()> {
        let mut failures = Vec::new();

        if self.backend == CacheBackend::Redis {
            if self.connection_string.trim().is_empty() {
                failures.push("Connection string cannot be empty".to_string());
            } else if !["redis://", "rediss://", "unix://"]
                .iter()
                .any(|scheme| self.connection_string.starts_with(scheme))
            {
                failures.push(format!(
                    "Unsupported connection string scheme: {}",
                    self.connection_string
                ));
            }
        }

        if self.default_sliding_secs == 0 {
            failures.push("Default sliding expiration must be positive".to_string());
        }

        if self.retry_on_connection_failed {
            if self.delta_backoff_ms == 0 {
                failures.push("Delta backoff must be positive when retry is enabled".to_string());
            }
            if self.delta_backoff_ms > self.max_delta_backoff_ms {
                failures.push("Delta backoff cannot exceed the max delta backoff".to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Config(failures.join("; ")))
        }
    }

    /// Default sliding expiration as a duration.
    pub fn default_sliding_expiration(&self) -> Duration {
        Duration::from_secs(self.default_sliding_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            connection_string: "redis://127.0.0.1:6379".to_string(),
            retry_on_connection_failed: false,
            connect_retry: 3,
            delta_backoff_ms: 1000,
            max_delta_backoff_ms: 10_000,
            connect_timeout_ms: 5000,
            default_sliding_secs: 3 * 60 * 60,
            cleanup_interval: 1,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
