//! Cache Service Module
//!
//! Typed get/set/remove operations over the shared store connection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{
    expiration, BufferPool, CachePolicy, JsonCodec, Outcome, Payload, PayloadCodec,
};
use crate::connection::LazyConnection;
use crate::error::{CacheError, Result};
use crate::store::{ConnectionFactory, StoreWrite};

// == Wrapper Cache ==
/// Key-value cache over a lazily connected backing store.
///
/// Values go through a [`PayloadCodec`] (JSON by default). Expiration is
/// computed from a [`CachePolicy`] before any I/O happens, so an invalid
/// policy never opens a connection. Store failures are logged with the key
/// and returned to the caller unchanged.
pub struct WrapperCache<C = JsonCodec> {
    connection: LazyConnection,
    codec: C,
    pool: BufferPool,
    default_policy: CachePolicy,
}

impl WrapperCache<JsonCodec> {
    // == Constructor ==
    /// Creates a JSON-backed cache that connects through `factory` on first use.
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self::with_codec(factory, JsonCodec)
    }
}

impl<C: PayloadCodec> WrapperCache<C> {
    /// Creates a cache with a custom codec.
    pub fn with_codec(factory: Arc<dyn ConnectionFactory>, codec: C) -> Self {
        Self {
            connection: LazyConnection::new(factory),
            codec,
            pool: BufferPool::new(),
            default_policy: CachePolicy::fallback(),
        }
    }

    /// Replaces the policy used when callers supply none.
    pub fn with_default_policy(mut self, policy: CachePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn default_policy(&self) -> &CachePolicy {
        &self.default_policy
    }

    // == Set ==
    /// Stores `value` under `key` with the default policy.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.set_with_policy(key, value, &self.default_policy, cancel)
            .await
    }

    /// Stores `value` under `key` with an explicit policy.
    pub async fn set_with_policy<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        policy: &CachePolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!("Set cache with key: {}", key);
        let payload = self.codec.encode(value)?;
        self.set_payload(key, &payload, policy, cancel).await
    }

    /// Stores `value` under `key` with the policy produced by `policy_factory`.
    ///
    /// Falls back to the default policy when the factory yields none.
    pub async fn set_with<T, F>(
        &self,
        key: &str,
        value: &T,
        policy_factory: F,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> Option<CachePolicy>,
    {
        let policy = self.resolve_policy(policy_factory());
        self.set_with_policy(key, value, &policy, cancel).await
    }

    /// Stores an already serialized payload, flattening it first if it has several segments.
    pub async fn set_payload(
        &self,
        key: &str,
        payload: &Payload,
        policy: &CachePolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel)?;
        let expiry = expiration::entry_expiry(policy, Utc::now())?;

        let store = self.connection.get(cancel).await?;
        let value = self.pool.contiguous(payload);
        debug!(
            "Writing {} bytes for key {} (ttl: {:?}, sliding: {:?})",
            value.len(),
            key,
            expiry.ttl,
            expiry.sliding
        );

        guarded(cancel, store.set(key, &value, expiry))
            .await
            .inspect_err(|e| error!("Set error for key {}: {}", key, e))
    }

    // == Set Many ==
    /// Stores every entry of `entries` in one batch.
    ///
    /// `policy_factory` is called once per key, so entries may expire
    /// differently. All policies are checked before anything is sent; any
    /// failed write fails the whole call.
    pub async fn set_many<T, F>(
        &self,
        entries: &HashMap<String, T>,
        mut policy_factory: F,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        T: Serialize,
        F: FnMut(&str) -> Option<CachePolicy>,
    {
        check_cancelled(cancel)?;
        info!("Set cache batch of {} keys", entries.len());

        let mut writes = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let policy = self.resolve_policy(policy_factory(key.as_str()));
            let expiry = expiration::entry_expiry(&policy, Utc::now())?;
            let payload = self.codec.encode(value)?;
            let value = if payload.is_single_segment() {
                payload.into_contiguous()
            } else {
                Bytes::copy_from_slice(&self.pool.contiguous(&payload))
            };
            writes.push(StoreWrite {
                key: key.clone(),
                value,
                expiry,
            });
        }

        if writes.is_empty() {
            return Ok(());
        }

        let store = self.connection.get(cancel).await?;
        guarded(cancel, store.set_many(writes))
            .await
            .inspect_err(|e| error!("Batch set error for {} keys: {}", entries.len(), e))
    }

    // == Get ==
    /// Reads and decodes the value of `key`, restarting its sliding window.
    ///
    /// A missing key yields `Outcome::Failure("Not Found")`. A payload that
    /// does not decode into `T` is an error, not a failure outcome.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome<T>> {
        info!("Get cache value with key: {}", key);
        match self.get_bytes(key, cancel).await? {
            Some(bytes) => Ok(Outcome::Success(self.codec.decode(&bytes)?)),
            None => Ok(Outcome::not_found()),
        }
    }

    /// Reads the raw stored bytes of `key`.
    pub async fn get_bytes(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        check_cancelled(cancel)?;
        let store = self.connection.get(cancel).await?;

        guarded(cancel, store.get(key))
            .await
            .inspect_err(|e| error!("Get error for key {}: {}", key, e))
    }

    // == Get Many ==
    /// Reads several keys in one round trip.
    ///
    /// The map holds only the keys that were found, so a partial hit is told
    /// apart from a complete one by comparing its length with `keys`. Returns
    /// `Outcome::Failure("Not Found")` when nothing was found.
    pub async fn get_many<T: DeserializeOwned>(
        &self,
        keys: &[String],
        cancel: &CancellationToken,
    ) -> Result<Outcome<HashMap<String, T>>> {
        check_cancelled(cancel)?;
        if keys.is_empty() {
            return Ok(Outcome::not_found());
        }
        info!("Get cache values for {} keys", keys.len());

        let store = self.connection.get(cancel).await?;
        let values = guarded(cancel, store.get_many(keys))
            .await
            .inspect_err(|e| error!("Batch get error for {} keys: {}", keys.len(), e))?;

        let mut found = HashMap::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            if let Some(bytes) = value {
                found.insert(key.clone(), self.codec.decode(&bytes)?);
            }
        }

        if found.is_empty() {
            Ok(Outcome::not_found())
        } else {
            Ok(Outcome::Success(found))
        }
    }

    // == Remove ==
    /// Deletes `key`. Deleting an absent key succeeds.
    pub async fn remove(&self, key: &str, cancel: &CancellationToken) -> Result<()> {
        info!("Remove cache with key: {}", key);
        check_cancelled(cancel)?;
        let store = self.connection.get(cancel).await?;

        let removed = guarded(cancel, store.delete(key))
            .await
            .inspect_err(|e| error!("Remove error for key {}: {}", key, e))?;
        debug!("Remove key {} existed: {}", key, removed);
        Ok(())
    }

    // == Connection ==
    /// Time of the latest successful connection to the store.
    pub fn last_connected_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.connection.last_connected_at()
    }

    /// Releases the store connection; the next operation reconnects.
    pub fn close(&self) {
        self.connection.close();
    }

    fn resolve_policy(&self, policy: Option<CachePolicy>) -> CachePolicy {
        policy.unwrap_or_else(|| {
            warn!(
                "Input cache policy is missing, using default policy: {:?}",
                self.default_policy
            );
            self.default_policy.clone()
        })
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(CacheError::Cancelled)
    } else {
        Ok(())
    }
}

/// Races store I/O against the token. The store may still complete the call.
async fn guarded<T>(
    cancel: &CancellationToken,
    io: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CacheError::Cancelled),
        result = io => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryConnectionFactory, MemoryStore, Store};
    use std::time::Duration;

    fn memory_cache() -> (WrapperCache, Arc<MemoryStore>) {
        let factory = MemoryConnectionFactory::default();
        let store = factory.store();
        (WrapperCache::new(Arc::new(factory)), store)
    }

    #[tokio::test]
    async fn test_set_uses_default_policy() {
        let (cache, store) = memory_cache();
        let token = CancellationToken::new();

        cache.set("k", "v", &token).await.unwrap();

        let ttl = store.ttl("k").await.unwrap().unwrap();
        assert!(ttl > 3 * 60 * 60 - 5 && ttl <= 3 * 60 * 60);
    }

    #[tokio::test]
    async fn test_set_with_missing_policy_falls_back() {
        let (cache, store) = memory_cache();
        let cache = cache.with_default_policy(
            CachePolicy::new().sliding_expiration(Duration::from_secs(600)),
        );
        let token = CancellationToken::new();

        cache.set_with("k", &1u32, || None, &token).await.unwrap();

        let ttl = store.ttl("k").await.unwrap().unwrap();
        assert!(ttl > 590 && ttl <= 600);
    }

    #[tokio::test]
    async fn test_unbounded_policy_sets_no_ttl() {
        let (cache, store) = memory_cache();
        let token = CancellationToken::new();

        cache
            .set_with_policy("k", "v", &CachePolicy::new(), &token)
            .await
            .unwrap();

        assert_eq!(store.ttl("k").await, Some(None));
    }

    #[tokio::test]
    async fn test_get_many_empty_keys_skips_store() {
        let (cache, store) = memory_cache();
        let token = CancellationToken::new();

        let outcome = cache.get_many::<String>(&[], &token).await.unwrap();

        assert_eq!(outcome, Outcome::not_found());
        assert_eq!(store.stats().await.operations(), 0);
        assert!(cache.last_connected_at().is_none());
    }

    #[tokio::test]
    async fn test_set_many_per_key_policies() {
        let (cache, store) = memory_cache();
        let token = CancellationToken::new();
        let entries = HashMap::from([
            ("short".to_string(), 1u32),
            ("long".to_string(), 2u32),
        ]);

        cache
            .set_many(
                &entries,
                |key| {
                    let secs = if key == "short" { 60 } else { 3600 };
                    Some(CachePolicy::new().sliding_expiration(Duration::from_secs(secs)))
                },
                &token,
            )
            .await
            .unwrap();

        assert!(matches!(store.ttl("short").await, Some(Some(t)) if t <= 60));
        assert!(matches!(store.ttl("long").await, Some(Some(t)) if t > 60));
    }

    /// JSON split in two segments, as a streaming serializer would hand it over.
    struct SplitJsonCodec;

    impl PayloadCodec for SplitJsonCodec {
        fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Payload> {
            let bytes = Bytes::from(
                serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?,
            );
            let mid = bytes.len() / 2;
            Ok(Payload::from_segments([bytes.slice(..mid), bytes.slice(mid..)]))
        }

        fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
            JsonCodec.decode(bytes)
        }
    }

    #[tokio::test]
    async fn test_set_many_flattens_segments_through_pool() {
        let factory = MemoryConnectionFactory::default();
        let cache = WrapperCache::with_codec(Arc::new(factory.clone()), SplitJsonCodec);
        let token = CancellationToken::new();
        let entries = HashMap::from([
            ("a".to_string(), "hello".to_string()),
            ("b".to_string(), "world".to_string()),
        ]);
        assert_eq!(cache.pool.available(), 0);

        cache.set_many(&entries, |_| None, &token).await.unwrap();

        // One scratch buffer, leased per entry and returned each time
        assert_eq!(cache.pool.available(), 1);
        assert_eq!(
            cache.get::<String>("b", &token).await.unwrap(),
            Outcome::Success("world".to_string())
        );
        assert_eq!(
            factory.store().get("a").await.unwrap(),
            Some(b"\"hello\"".to_vec())
        );
    }
}
