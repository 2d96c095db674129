//! Store Module
//!
//! The backing-store seam: a byte-oriented key-value client and the factory that connects it.
//!
//! # Backends
//! - [`RedisStore`]: multiplexed Redis connection
//! - [`MemoryStore`]: in-process store with TTL, for tests and offline runs

mod entry;
mod expiry;
mod memory;
mod redis_store;
mod stats;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub use entry::{current_timestamp_ms, StoredEntry};
pub use expiry::EntryExpiry;
pub use memory::{MemoryConnectionFactory, MemoryStore};
pub use redis_store::{RedisConnectionFactory, RedisStore};
pub use stats::StoreStats;

// == Store Write ==
/// One write in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub key: String,
    pub value: Bytes,
    pub expiry: EntryExpiry,
}

// == Store Trait ==
/// Byte-oriented client of the backing store.
///
/// A single handle is shared by every operation of a cache, so implementations
/// must support concurrent calls.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads the raw value of `key`, restarting its sliding window on a hit.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &[u8], expiry: EntryExpiry) -> Result<()>;

    /// Deletes `key`, returning whether something was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Reads several keys in one round trip; results are positional. Hits are renewed like [`Store::get`].
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Dispatches all writes as one batch and waits for every one of them.
    async fn set_many(&self, writes: Vec<StoreWrite>) -> Result<()>;

    /// Releases the underlying connection.
    fn close(&self) {}
}

// == Connection Factory ==
/// Establishes a store handle. May fail; callers decide whether to retry.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Store>>;
}
