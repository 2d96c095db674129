//! Wrapper Cache demo
//!
//! Runs the topic-description cache-aside sample against the configured backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wrapper_cache::store::{
    ConnectionFactory, MemoryConnectionFactory, MemoryStore, RedisConnectionFactory,
};
use wrapper_cache::{
    spawn_cleanup_task, CacheBackend, CachePolicy, Config, Outcome, WrapperCache,
};

/// Key prefix of topic descriptions
const TOPIC_PREFIX: &str = "TopicCode";

/// Main entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Build the connection factory for the configured backend
/// 4. Look up a topic description, filling the cache on a miss
/// 5. Write and read back a batch of entries
/// 6. Release the connection
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wrapper_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    config.validate().context("invalid cache configuration")?;
    info!(
        "Configuration loaded: backend={:?}, retry={}, default_sliding={}s",
        config.backend, config.retry_on_connection_failed, config.default_sliding_secs
    );

    let mut cleanup_handle = None;
    let factory: Arc<dyn ConnectionFactory> = match config.backend {
        CacheBackend::Redis => Arc::new(
            RedisConnectionFactory::from_config(&config)
                .context("failed to build Redis connection factory")?,
        ),
        CacheBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            cleanup_handle = Some(spawn_cleanup_task(store.clone(), config.cleanup_interval));
            Arc::new(MemoryConnectionFactory::new(store))
        }
    };

    let cache = WrapperCache::new(factory).with_default_policy(
        CachePolicy::new().sliding_expiration(config.default_sliding_expiration()),
    );
    let cancel = CancellationToken::new();

    let topic_code = std::env::args().nth(1).unwrap_or_else(|| "S01".to_string());
    let description = topic_description(&cache, &topic_code, &cancel).await?;
    info!("Topic {}: {}", topic_code, description);

    let batch = HashMap::from([
        (format!("{}_S02", TOPIC_PREFIX), "Description for S02".to_string()),
        (format!("{}_S03", TOPIC_PREFIX), "Description for S03".to_string()),
    ]);
    cache
        .set_many(
            &batch,
            |_| Some(CachePolicy::new().sliding_expiration(Duration::from_secs(60 * 60))),
            &cancel,
        )
        .await
        .context("batch set failed")?;

    let keys: Vec<String> = batch.keys().cloned().collect();
    match cache.get_many::<String>(&keys, &cancel).await? {
        Outcome::Success(found) => info!("Batch read {} of {} keys", found.len(), keys.len()),
        Outcome::Failure(reason) => info!("Batch read failed: {}", reason),
    }

    if let Some(at) = cache.last_connected_at() {
        info!("Connected at {}", at.to_rfc3339());
    }
    cache.close();
    if let Some(handle) = cleanup_handle {
        handle.abort();
    }

    Ok(())
}

/// Reads a topic description, storing a generated one with 2h sliding expiration on a miss.
async fn topic_description(
    cache: &WrapperCache,
    topic_code: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<String> {
    let cache_key = format!("{}_{}", TOPIC_PREFIX, topic_code);
    info!("Cache key: {}", cache_key);

    if let Outcome::Success(description) = cache.get::<String>(&cache_key, cancel).await? {
        info!("Value from cache: {}", description);
        return Ok(description);
    }

    let description = format!("Description for {}", topic_code);
    cache
        .set_with(
            &cache_key,
            &description,
            || Some(CachePolicy::new().sliding_expiration(Duration::from_secs(2 * 60 * 60))),
            cancel,
        )
        .await
        .with_context(|| format!("failed to cache {}", cache_key))?;
    info!("Set value since no value from cache");

    Ok(description)
}
