//! TTL Cleanup Task
//!
//! Background task that periodically purges expired entries from a [`MemoryStore`].
//! Redis expires keys on its own, so only the in-process store needs this.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that periodically purges expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between runs.
///
/// # Arguments
/// * `store` - Shared in-process store
/// * `cleanup_interval_secs` - Interval in seconds between runs
///
/// # Returns
/// A JoinHandle for the spawned task, to be aborted on shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(store: Arc<MemoryStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.cleanup_expired().await;

            if removed > 0 {
                let stats = store.stats().await;
                info!(
                    "TTL cleanup: removed {} expired entries ({} left, hit rate {:.1}%)",
                    removed,
                    stats.total_entries,
                    stats.hit_rate() * 100.0
                );
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
