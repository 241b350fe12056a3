//! Redis connection pool construction.
//!
//! Pools are built once by the application's composition root and
//! injected into every cache instance; nothing here is process-global.

use crate::config::RedisCacheConfig;
use crate::error::{CacheError, CacheResult};
use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;
use url::Url;

/// Create a Redis connection pool from the configured DSN.
///
/// Verifies liveness with a `PING` before handing the pool out. If the
/// DSN carries credentials the client authenticates during connection
/// setup. Any construction failure is wrapped into
/// [`CacheError::Connection`] — without a connection no cache operation
/// can proceed.
pub async fn create_pool(config: &RedisCacheConfig) -> CacheResult<Pool> {
    info!("Creating Redis connection pool...");

    let cfg = Config::from_url(&config.dsn);

    let pool = cfg
        .builder()
        .map_err(|e| CacheError::Connection(format!("invalid Redis DSN: {e}")))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| CacheError::Connection(format!("failed to build pool: {e}")))?;

    // Liveness probe
    let mut conn = pool
        .get()
        .await
        .map_err(|e| CacheError::Connection(e.to_string()))?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await
        .map_err(|e| CacheError::Connection(e.to_string()))?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Create a pool pointed at a specific logical database of the
/// configured DSN.
///
/// Used by the scoped variable caches, which live on their own logical
/// databases next to the default database 0.
pub async fn create_pool_with_database(
    config: &RedisCacheConfig,
    database: u8,
) -> CacheResult<Pool> {
    let rewritten = RedisCacheConfig {
        dsn: with_database(&config.dsn, database)?,
        ..config.clone()
    };
    create_pool(&rewritten).await
}

/// Rewrites the logical database index of a Redis DSN.
pub fn with_database(dsn: &str, database: u8) -> CacheResult<String> {
    let mut url = Url::parse(dsn)
        .map_err(|e| CacheError::Configuration(format!("invalid Redis DSN '{dsn}': {e}")))?;
    url.set_path(&format!("/{database}"));
    Ok(url.into())
}
