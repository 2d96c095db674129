//! Memory Store Module
//!
//! In-process backing store with per-entry TTL, used by tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::store::{ConnectionFactory, EntryExpiry, Store, StoreStats, StoreWrite, StoredEntry};

// == Memory State ==
/// Key-value map plus counters, guarded as a unit by [`MemoryStore`].
#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, StoredEntry>,
    stats: StoreStats,
}

impl MemoryState {
    fn read(&mut self, key: &str) -> Option<Vec<u8>> {
        let live = match self.entries.get(key).map(StoredEntry::is_expired) {
            Some(true) => {
                self.entries.remove(key);
                None
            }
            Some(false) => self.entries.get_mut(key).map(|entry| {
                entry.renew();
                entry.value.to_vec()
            }),
            None => None,
        };

        self.stats.record_read(live.is_some());
        self.stats.set_total_entries(self.entries.len());
        live
    }

    fn write(&mut self, key: String, value: Bytes, expiry: EntryExpiry) {
        self.entries.insert(key, StoredEntry::new(value, expiry));
        self.stats.record_write();
        self.stats.set_total_entries(self.entries.len());
    }
}

// == Memory Store ==
/// Thread-safe in-process store.
///
/// Expired entries read as absent and are dropped lazily on access or by
/// [`MemoryStore::cleanup_expired`]. Reads restart the window of sliding entries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    closes: AtomicUsize,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Stats ==
    /// Returns current operation statistics.
    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    // == TTL ==
    /// Remaining TTL of a live entry in seconds; `Some(None)` for entries without TTL.
    pub async fn ttl(&self, key: &str) -> Option<Option<u64>> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(StoredEntry::ttl_remaining)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired());
        let count = before - state.entries.len();
        let remaining = state.entries.len();
        state.stats.set_total_entries(remaining);
        count
    }

    // == Length ==
    /// Returns the number of entries held, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of times [`Store::close`] was called on this store.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.write().await.read(key))
    }

    async fn set(&self, key: &str, value: &[u8], expiry: EntryExpiry) -> Result<()> {
        self.state
            .write()
            .await
            .write(key.to_string(), Bytes::copy_from_slice(value), expiry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state
            .entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired());
        state.stats.record_delete();
        let remaining = state.entries.len();
        state.stats.set_total_entries(remaining);
        Ok(removed)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut state = self.state.write().await;
        Ok(keys.iter().map(|key| state.read(key)).collect())
    }

    async fn set_many(&self, writes: Vec<StoreWrite>) -> Result<()> {
        let mut state = self.state.write().await;
        for write in writes {
            state.write(write.key, write.value, write.expiry);
        }
        Ok(())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// == Memory Connection Factory ==
/// Hands out the same shared [`MemoryStore`] on every connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnectionFactory {
    store: Arc<MemoryStore>,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnectionFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The store handed out by this factory.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Number of successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn connect(&self) -> Result<Arc<dyn Store>> {
        let count = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Memory store connect #{}", count);
        Ok(self.store.clone() as Arc<dyn Store>)
    }
}
