//! Error types for the cache wrapper
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache wrapper.
///
/// A missing key is not an error; see [`crate::cache::Outcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Expiration policy cannot produce a TTL (e.g. absolute expiration in the past)
    #[error("Invalid cache policy: {0}")]
    InvalidPolicy(String),

    /// The connection factory failed to establish a store handle
    #[error("Connection error: {0}")]
    Connection(String),

    /// A store read or write failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// A value could not be encoded into a payload
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A cached payload could not be decoded into the requested type
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The caller's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration is missing or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache wrapper.
pub type Result<T> = std::result::Result<T, CacheError>;
