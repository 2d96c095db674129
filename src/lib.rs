//! Wrapper Cache - a typed cache over a shared Redis connection
//!
//! Provides get/set/remove with sliding, absolute and relative expiration,
//! batched reads and writes, and a lazily established multiplexed connection.

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod store;
pub mod tasks;

pub use cache::{CachePolicy, Outcome, WrapperCache};
pub use config::{CacheBackend, Config};
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
