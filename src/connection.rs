//! Connection Module
//!
//! Lazily establishes the one shared store handle and hands it out to every operation.
//!
//! The handle lives in a single slot behind a read-write lock that is only
//! written when a connection is established or released, so once connected,
//! callers only take shared reads and never wait on each other. Establishment
//! goes through an async gate so at most one factory call is in flight.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};
use crate::store::{ConnectionFactory, Store};

// == Lazy Connection ==
/// Guarded initializer holding at most one live store handle.
pub struct LazyConnection {
    factory: Arc<dyn ConnectionFactory>,
    slot: RwLock<Option<Arc<dyn Store>>>,
    gate: tokio::sync::Mutex<()>,
    /// Completed establishment attempts, successful or not
    attempts: AtomicU64,
    /// Attempt number and message of the latest failed establishment
    last_failure: Mutex<Option<(u64, String)>>,
    /// Unix milliseconds of the latest successful connect, 0 = never
    last_connect_ms: AtomicI64,
}

impl LazyConnection {
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            slot: RwLock::new(None),
            gate: tokio::sync::Mutex::new(()),
            attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
            last_connect_ms: AtomicI64::new(0),
        }
    }

    // == Get ==
    /// Returns the shared handle, connecting first if there is none.
    ///
    /// Callers queued behind an attempt that fails receive that attempt's
    /// error rather than retrying; the next caller to arrive afterwards
    /// starts a fresh attempt.
    pub async fn get(&self, cancel: &CancellationToken) -> Result<Arc<dyn Store>> {
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        if let Some(store) = self.current() {
            return Ok(store);
        }

        self.connect_slow(cancel).await
    }

    async fn connect_slow(&self, cancel: &CancellationToken) -> Result<Arc<dyn Store>> {
        let seen_attempts = self.attempts.load(Ordering::Acquire);

        let _guard = tokio::select! {
            guard = self.gate.lock() => guard,
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
        };

        if let Some(store) = self.current() {
            return Ok(store);
        }

        let last_failure = self.last_failure.lock().clone();
        if let Some((attempt, message)) = last_failure {
            if attempt > seen_attempts {
                return Err(CacheError::Connection(message));
            }
        }

        debug!("Establishing store connection");
        let result = self.factory.connect().await;
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;

        match result {
            Ok(store) => {
                *self.slot.write() = Some(Arc::clone(&store));
                *self.last_failure.lock() = None;
                self.last_connect_ms
                    .store(Utc::now().timestamp_millis(), Ordering::Release);
                info!("Store connection established (attempt {})", attempt);
                Ok(store)
            }
            Err(err) => {
                let message = match &err {
                    CacheError::Connection(msg) => msg.clone(),
                    other => other.to_string(),
                };
                warn!("Store connection attempt {} failed: {}", attempt, message);
                *self.last_failure.lock() = Some((attempt, message.clone()));
                Err(CacheError::Connection(message))
            }
        }
    }

    /// The live handle, if connected.
    pub fn current(&self) -> Option<Arc<dyn Store>> {
        self.slot.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Time of the latest successful connect.
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        match self.last_connect_ms.load(Ordering::Acquire) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    // == Close ==
    /// Releases the handle, returning whether there was one to release.
    ///
    /// Safe to call repeatedly; the next `get` establishes a new connection.
    pub fn close(&self) -> bool {
        let released = self.slot.write().take();
        match released {
            Some(store) => {
                store.close();
                info!("Store connection released");
                true
            }
            None => false,
        }
    }
}

impl Drop for LazyConnection {
    fn drop(&mut self) {
        self.close();
    }
}
