//! Cache Module
//!
//! Typed key-value cache with expiration policies over a shared store connection.

mod buffer;
mod codec;
pub mod expiration;
mod outcome;
mod policy;
mod service;


// Re-export public types
pub use buffer::{BufferPool, Contiguous, PooledBuffer};
pub use codec::{JsonCodec, Payload, PayloadCodec};
pub use outcome::Outcome;
pub use policy::CachePolicy;
pub use service::WrapperCache;

use std::time::Duration;

// == Public Constants ==
/// Failure message of lookups that found nothing
pub const NOT_FOUND: &str = "Not Found";

/// Sliding expiration applied when a caller supplies no policy
pub const DEFAULT_SLIDING_EXPIRATION: Duration = Duration::from_secs(3 * 60 * 60);
