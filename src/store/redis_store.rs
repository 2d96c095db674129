//! Redis Store Module
//!
//! Backing store over a single multiplexed Redis connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{current_timestamp_ms, ConnectionFactory, EntryExpiry, Store, StoreWrite};

/// Hash field holding the absolute deadline in Unix milliseconds
const ABSOLUTE_FIELD: &str = "absexp";
/// Hash field holding the sliding window in seconds
const SLIDING_FIELD: &str = "sldexp";
/// Hash field holding the payload
const DATA_FIELD: &str = "data";
/// Field value meaning "not set"
const NOT_PRESENT: i64 = -1;

/// Reply of `HMGET key absexp sldexp data`
type StoredHash = (Option<i64>, Option<i64>, Option<Vec<u8>>);

// == Redis Store ==
/// Store handle over a multiplexed [`ConnectionManager`].
///
/// Each entry is a hash of its payload plus its absolute deadline and sliding
/// window, so reads can restart the window with `EXPIRE`. The manager is cheap
/// to clone; each call works on its own clone so concurrent operations share
/// the one underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

/// Queues the replacement of `key` as one hash, followed by its TTL.
fn queue_write(pipe: &mut redis::Pipeline, key: &str, value: &[u8], expiry: &EntryExpiry) {
    let absolute = expiry
        .absolute_ms
        .and_then(|ms| i64::try_from(ms).ok())
        .unwrap_or(NOT_PRESENT);
    let sliding = expiry
        .sliding
        .and_then(|secs| i64::try_from(secs).ok())
        .unwrap_or(NOT_PRESENT);

    pipe.del(key).ignore();
    pipe.cmd("HSET")
        .arg(key)
        .arg(ABSOLUTE_FIELD)
        .arg(absolute)
        .arg(SLIDING_FIELD)
        .arg(sliding)
        .arg(DATA_FIELD)
        .arg(value)
        .ignore();
    if let Some(ttl) = expiry.ttl {
        pipe.expire(key, to_seconds(ttl)).ignore();
    }
}

/// Rebuilds the renewal part of an expiry from its hash fields.
fn stored_expiry(absolute: Option<i64>, sliding: Option<i64>) -> EntryExpiry {
    EntryExpiry {
        ttl: None,
        sliding: sliding.and_then(|secs| u64::try_from(secs).ok()),
        absolute_ms: absolute.and_then(|ms| u64::try_from(ms).ok()),
    }
}

fn to_seconds(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let (absolute, sliding, data) = redis::cmd("HMGET")
            .arg(key)
            .arg(ABSOLUTE_FIELD)
            .arg(SLIDING_FIELD)
            .arg(DATA_FIELD)
            .query_async::<StoredHash>(&mut conn)
            .await?;

        let Some(data) = data else {
            return Ok(None);
        };
        if let Some(ttl) = stored_expiry(absolute, sliding).renewal(current_timestamp_ms()) {
            conn.expire::<_, ()>(key, to_seconds(ttl)).await?;
        }
        Ok(Some(data))
    }

    async fn set(&self, key: &str, value: &[u8], expiry: EntryExpiry) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        queue_write(&mut pipe, key, value, &expiry);

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut reads = redis::pipe();
        for key in keys {
            reads
                .cmd("HMGET")
                .arg(key)
                .arg(ABSOLUTE_FIELD)
                .arg(SLIDING_FIELD)
                .arg(DATA_FIELD);
        }
        let mut conn = self.connection.clone();
        let hashes = reads.query_async::<Vec<StoredHash>>(&mut conn).await?;

        let now = current_timestamp_ms();
        let mut renewals = redis::pipe();
        let mut renewed = 0usize;
        let mut values = Vec::with_capacity(keys.len());
        for (key, (absolute, sliding, data)) in keys.iter().zip(hashes) {
            if data.is_some() {
                if let Some(ttl) = stored_expiry(absolute, sliding).renewal(now) {
                    renewals.expire(key, to_seconds(ttl)).ignore();
                    renewed += 1;
                }
            }
            values.push(data);
        }

        if renewed > 0 {
            renewals.query_async::<()>(&mut conn).await?;
            debug!("Redis batch read renewed {} sliding entries", renewed);
        }
        Ok(values)
    }

    async fn set_many(&self, writes: Vec<StoreWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for write in &writes {
            queue_write(&mut pipe, &write.key, &write.value, &write.expiry);
        }

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        debug!("Redis batch of {} writes completed", writes.len());
        Ok(())
    }

    fn close(&self) {
        // The socket closes once the last clone of the manager is dropped.
        debug!("Redis store handle released");
    }
}

// == Redis Connection Factory ==
/// Connects [`RedisStore`] handles from a parsed connection string.
#[derive(Clone)]
pub struct RedisConnectionFactory {
    client: Client,
    manager_config: ConnectionManagerConfig,
}

impl RedisConnectionFactory {
    /// Builds a factory from configuration. Parses the URL but does not connect.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::open(config.connection_string.as_str())
            .map_err(|e| CacheError::Config(format!("Invalid Redis connection string: {}", e)))?;

        let mut manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_millis(config.connect_timeout_ms));

        if config.retry_on_connection_failed {
            manager_config = manager_config
                .set_number_of_retries(config.connect_retry)
                .set_factor(config.delta_backoff_ms)
                .set_max_delay(config.max_delta_backoff_ms);
        }

        Ok(Self {
            client,
            manager_config,
        })
    }
}

#[async_trait]
impl ConnectionFactory for RedisConnectionFactory {
    async fn connect(&self) -> Result<Arc<dyn Store>> {
        let connection =
            ConnectionManager::new_with_config(self.client.clone(), self.manager_config.clone())
                .await
                .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!("Redis connection established");
        Ok(Arc::new(RedisStore::new(connection)))
    }
}
