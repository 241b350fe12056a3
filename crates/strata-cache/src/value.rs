//! Typed value cache over one key namespace.

use crate::error::CacheResult;
use crate::namespace::KeyNamespace;
use crate::ttl::Ttl;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// SCAN batch size for namespace-wide iteration.
const SCAN_COUNT: usize = 1000;

/// Typed cache for serialized values under one namespace.
///
/// Reads and writes fail soft: a missing key, an unreadable payload, and
/// a transport failure all look like a miss, and a failed write is a
/// silent no-op. Counters (`incr`/`decr`) and namespace-wide deletion
/// (`clear`) surface errors instead — their entire purpose is the side
/// effect, so swallowing a failure there would corrupt caller-visible
/// invariants.
pub struct ValueCache<T> {
    pool: Pool,
    namespace: KeyNamespace,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ValueCache<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            namespace: self.namespace.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> ValueCache<T> {
    /// Creates a cache over the given pool and namespace.
    #[must_use]
    pub fn new(pool: Pool, namespace: KeyNamespace) -> Self {
        Self {
            pool,
            namespace,
            _marker: PhantomData,
        }
    }

    /// The namespace all keys of this cache live under.
    #[must_use]
    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    /// Fetch and deserialize one value.
    ///
    /// Returns `None` on missing key, unreadable payload, or transport
    /// error — callers cannot (and must not) distinguish the three.
    pub async fn get(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache read for key '{}' failed: {}", key, e);
                None
            }
        }
    }

    async fn try_get(&self, key: &str) -> CacheResult<Option<T>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(self.namespace.key(key)).await?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => {
                    debug!("Cache hit for key '{}'", key);
                    Ok(Some(value))
                }
                Err(e) => {
                    // Corrupted or foreign payload, indistinguishable from a miss.
                    warn!("Discarding unreadable payload for key '{}': {}", key, e);
                    Ok(None)
                }
            },
            None => {
                debug!("Cache miss for key '{}'", key);
                Ok(None)
            }
        }
    }

    /// Batched fetch of many keys in one `MGET`.
    ///
    /// When `include_missing` is false, keys with no readable value are
    /// omitted from the map entirely rather than mapped to `None`.
    /// Transport failure yields an empty map.
    pub async fn get_many(&self, keys: &[&str], include_missing: bool) -> HashMap<String, Option<T>> {
        match self.try_get_many(keys, include_missing).await {
            Ok(values) => values,
            Err(e) => {
                warn!("Batched cache read of {} keys failed: {}", keys.len(), e);
                HashMap::new()
            }
        }
    }

    async fn try_get_many(
        &self,
        keys: &[&str],
        include_missing: bool,
    ) -> CacheResult<HashMap<String, Option<T>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.conn().await?;
        let full_keys: Vec<String> = keys.iter().map(|key| self.namespace.key(key)).collect();
        let raw: Vec<Option<String>> = conn.mget(&full_keys).await?;

        let mut results = HashMap::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(raw) {
            let parsed = value.and_then(|json| serde_json::from_str(&json).ok());
            if parsed.is_some() {
                results.insert((*key).to_string(), parsed);
            } else if include_missing {
                results.insert((*key).to_string(), None);
            }
        }

        Ok(results)
    }

    /// Serialize and store one value with a TTL. Fails soft.
    pub async fn set(&self, key: &str, value: &T, ttl: Ttl) {
        if let Err(e) = self.try_set(key, value, ttl).await {
            warn!("Cache write for key '{}' failed: {}", key, e);
        }
    }

    async fn try_set(&self, key: &str, value: &T, ttl: Ttl) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;
        let ttl_secs = ttl.as_secs();

        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(self.namespace.key(key), json, ttl_secs)
            .await?;

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }

    /// Delete one key. Fails soft.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key).await {
            warn!("Cache delete for key '{}' failed: {}", key, e);
        }
    }

    async fn try_remove(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.namespace.key(key)).await?;
        Ok(())
    }

    /// Atomically increment the raw integer stored under `key`.
    ///
    /// The counter is stored unserialized. Errors surface.
    pub async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn().await?;
        Ok(conn.incr(self.namespace.key(key), 1i64).await?)
    }

    /// Atomically decrement the raw integer stored under `key`.
    ///
    /// The counter is stored unserialized. Errors surface.
    pub async fn decr(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn().await?;
        Ok(conn.decr(self.namespace.key(key), 1i64).await?)
    }

    /// Delete every key under this namespace.
    ///
    /// Iterates with cursor-based `SCAN` — never a single blocking
    /// full-keyspace listing. Errors surface: a silently skipped clear
    /// would corrupt caller-visible invariants.
    pub async fn clear(&self) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let deleted = delete_matching(&mut conn, &self.namespace.match_all()).await?;
        debug!("Cleared {} keys under '{}'", deleted, self.namespace.fqn());
        Ok(deleted)
    }

    /// Key count and approximate memory footprint of this namespace.
    ///
    /// Cursor-scans in batches of 1000, samples the memory usage of
    /// exactly one key, and approximates total size as count × sample —
    /// a trade-off against the cost of exact accounting at scale.
    pub async fn size(&self) -> CacheResult<(u64, u64)> {
        let mut conn = self.conn().await?;
        let pattern = self.namespace.match_all();

        let mut cursor = 0u64;
        let mut count = 0u64;
        let mut sampled: Option<u64> = None;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut *conn)
                .await?;

            count += keys.len() as u64;

            if sampled.is_none() {
                if let Some(first) = keys.first() {
                    // Sampling failure is tolerated; the count still stands.
                    sampled = redis::cmd("MEMORY")
                        .arg("USAGE")
                        .arg(first)
                        .query_async::<Option<u64>>(&mut *conn)
                        .await
                        .ok()
                        .flatten();
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok((count, sampled.unwrap_or(0) * count))
    }

    /// Opens a best-effort batch of independent writes, flushed as one
    /// atomic `MULTI`/`EXEC` round trip on close.
    ///
    /// Never used by the resolution algorithms; atomicity across reads
    /// belongs to server-side scripts.
    pub async fn begin_transaction(&self) -> CacheResult<WriteBatch<'_, T>> {
        let conn = self.conn().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        Ok(WriteBatch {
            cache: self,
            conn,
            pipe,
        })
    }

    /// Flush the entire logical database this cache lives on.
    ///
    /// Test-support escape hatch; fails soft.
    pub async fn clear_database(&self) {
        match self.conn().await {
            Ok(mut conn) => {
                if let Err(e) = redis::cmd("FLUSHDB").query_async::<()>(&mut *conn).await {
                    warn!("FLUSHDB failed: {}", e);
                }
            }
            Err(e) => warn!("FLUSHDB failed: {}", e),
        }
    }
}

/// A pending batch of writes, executed atomically on close.
pub struct WriteBatch<'a, T> {
    cache: &'a ValueCache<T>,
    conn: deadpool_redis::Connection,
    pipe: redis::Pipeline,
}

impl<T: Serialize + DeserializeOwned> WriteBatch<'_, T> {
    /// Queue a serialized write.
    pub fn set(&mut self, key: &str, value: &T, ttl: Ttl) -> &mut Self {
        match serde_json::to_string(value) {
            Ok(json) => {
                self.pipe
                    .set_ex(self.cache.namespace.key(key), json, ttl.as_secs())
                    .ignore();
            }
            Err(e) => warn!("Skipping unserializable batch write for key '{}': {}", key, e),
        }
        self
    }

    /// Queue a delete.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.pipe.del(self.cache.namespace.key(key)).ignore();
        self
    }

    /// Execute the queued writes in one atomic round trip. Fails soft.
    pub async fn close_transaction(mut self) {
        if let Err(e) = self.pipe.query_async::<()>(&mut *self.conn).await {
            warn!("Write batch failed: {}", e);
        }
    }
}

/// Cursor-scan `pattern` and delete matches in batches.
pub(crate) async fn delete_matching(
    conn: &mut deadpool_redis::Connection,
    pattern: &str,
) -> CacheResult<u64> {
    let mut cursor = 0u64;
    let mut deleted = 0u64;

    loop {
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut **conn)
            .await?;

        if !keys.is_empty() {
            let removed: u64 = conn.del(&keys).await?;
            deleted += removed;
        }

        cursor = next;
        if cursor == 0 {
            break;
        }
    }

    Ok(deleted)
}
