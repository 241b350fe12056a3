//! Reference-indirection cache.
//!
//! Many small index entries point into a shared pool of larger payload
//! values without duplicating storage. The index namespace holds
//! `index_key -> "ref1,ref2,...,refN"` mappings; payloads live in a
//! distinct [`ValueCache`] addressed by `{payload_prefix}:{ref}`. This
//! cache never stores payloads itself.
//!
//! Resolution must read the index and the payloads in one atomic round
//! trip — two client calls would race against index deletion — so every
//! resolve operation is a single server-side script (see [`crate::scripts`]).

use crate::error::{CacheError, CacheResult};
use crate::namespace::KeyNamespace;
use crate::scripts::ReferenceScripts;
use crate::ttl::Ttl;
use crate::value::{delete_matching, ValueCache};
use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Separator joining multiple references under one index key.
const REF_SEPARATOR: &str = ",";

/// Two-level cache resolving compact index entries to payloads held in
/// an associated [`ValueCache`].
///
/// All read paths fail soft and are never all-or-nothing: a malformed
/// or missing reference yields nothing, and a batch in which some
/// members fail independently still returns the successfully resolved
/// subset.
pub struct ReferenceCache<T> {
    pool: Pool,
    namespace: KeyNamespace,
    values: ValueCache<T>,
    scripts: ReferenceScripts,
}

impl<T: Serialize + DeserializeOwned> ReferenceCache<T> {
    /// Creates a reference cache with its index namespace and the value
    /// cache holding the referenced payloads.
    #[must_use]
    pub fn new(pool: Pool, namespace: KeyNamespace, values: ValueCache<T>) -> Self {
        Self {
            pool,
            namespace,
            values,
            scripts: ReferenceScripts::new(),
        }
    }

    /// The index namespace.
    #[must_use]
    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// The value cache the references resolve against.
    #[must_use]
    pub fn values(&self) -> &ValueCache<T> {
        &self.values
    }

    async fn conn(&self) -> CacheResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    fn decode(json: &str) -> Option<T> {
        match serde_json::from_str(json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable referenced payload");
                None
            }
        }
    }

    /// Atomically resolve an index key to its single referenced payload.
    pub async fn resolve_one(&self, key: &str) -> Option<T> {
        match self.try_resolve_one(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Reference resolution failed");
                None
            }
        }
    }

    async fn try_resolve_one(&self, key: &str) -> CacheResult<Option<T>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = self
            .scripts
            .resolve_one
            .key(self.namespace.key(key))
            .arg(self.values.namespace().key_prefix())
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Script(e.to_string()))?;

        Ok(raw.as_deref().and_then(Self::decode))
    }

    /// Atomically resolve an index key holding a comma-joined reference
    /// list, fetching all referenced payloads in one call.
    ///
    /// References that resolve to nothing are skipped.
    pub async fn resolve_list(&self, key: &str) -> Vec<T> {
        match self.try_resolve_list(key).await {
            Ok(values) => values,
            Err(e) => {
                warn!(key = %key, error = %e, "Reference list resolution failed");
                Vec::new()
            }
        }
    }

    async fn try_resolve_list(&self, key: &str) -> CacheResult<Vec<T>> {
        let mut conn = self.conn().await?;
        let raw: Vec<Option<String>> = self
            .scripts
            .resolve_list
            .key(self.namespace.key(key))
            .arg(self.values.namespace().key_prefix())
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Script(e.to_string()))?;

        Ok(raw
            .into_iter()
            .flatten()
            .filter_map(|json| Self::decode(&json))
            .collect())
    }

    /// Resolve many index keys in one scripted round trip.
    ///
    /// Index keys sharing an identical reference list are fetched once;
    /// the result is the flattened, order-independent union of all
    /// distinct payloads. Members failing independently do not affect
    /// the rest of the batch.
    pub async fn resolve_batch(&self, keys: &[&str]) -> Vec<T> {
        if keys.is_empty() {
            return Vec::new();
        }
        match self.try_resolve_batch(keys).await {
            Ok(values) => values,
            Err(e) => {
                warn!(count = keys.len(), error = %e, "Batch reference resolution failed");
                Vec::new()
            }
        }
    }

    async fn try_resolve_batch(&self, keys: &[&str]) -> CacheResult<Vec<T>> {
        let mut conn = self.conn().await?;

        let mut invocation = self.scripts.resolve_batch.prepare_invoke();
        for key in keys {
            invocation.key(self.namespace.key(key));
        }
        invocation.arg(self.values.namespace().key_prefix());

        let raw: Vec<Vec<Option<String>>> = invocation
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Script(e.to_string()))?;

        Ok(raw
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|json| Self::decode(&json))
            .collect())
    }

    /// Cursor-scan the index namespace for keys matching the given user
    /// prefixes and resolve the de-duplicated union as a batch.
    pub async fn resolve_prefix(&self, prefixes: &[&str]) -> Vec<T> {
        if prefixes.is_empty() {
            return Vec::new();
        }
        match self.try_resolve_prefix(prefixes).await {
            Ok(values) => values,
            Err(e) => {
                warn!(count = prefixes.len(), error = %e, "Prefix reference resolution failed");
                Vec::new()
            }
        }
    }

    async fn try_resolve_prefix(&self, prefixes: &[&str]) -> CacheResult<Vec<T>> {
        let mut conn = self.conn().await?;

        let mut invocation = self.scripts.resolve_prefix.prepare_invoke();
        invocation
            .arg(self.namespace.key_prefix())
            .arg(self.values.namespace().key_prefix());
        for prefix in prefixes {
            invocation.arg(*prefix);
        }

        let raw: Vec<Vec<Option<String>>> = invocation
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Script(e.to_string()))?;

        Ok(raw
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|json| Self::decode(&json))
            .collect())
    }

    /// Store a reference list under an index key.
    ///
    /// An empty list deletes the index key instead of storing an empty
    /// string. Fails soft.
    pub async fn set_list(&self, key: &str, refs: &[&str], ttl: Ttl) {
        if refs.is_empty() {
            self.remove(key).await;
            return;
        }
        self.set_raw(key, &refs.join(REF_SEPARATOR), ttl).await;
    }

    /// Read an index value directly as an opaque string, bypassing
    /// reference resolution. Fails soft.
    pub async fn get_raw(&self, key: &str) -> Option<String> {
        match self.try_get_raw(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Raw index read failed");
                None
            }
        }
    }

    async fn try_get_raw(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.get(self.namespace.key(key)).await?)
    }

    /// Store an index value directly as an opaque string, for callers
    /// whose reference is itself the final value. Fails soft.
    pub async fn set_raw(&self, key: &str, value: &str, ttl: Ttl) {
        if let Err(e) = self.try_set_raw(key, value, ttl).await {
            warn!(key = %key, error = %e, "Raw index write failed");
        }
    }

    async fn try_set_raw(&self, key: &str, value: &str, ttl: Ttl) -> CacheResult<()> {
        let ttl_secs = ttl.as_secs();
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(self.namespace.key(key), value, ttl_secs)
            .await?;
        debug!(key = %key, ttl = ttl_secs, "Stored index entry");
        Ok(())
    }

    /// Delete one index key. Fails soft.
    pub async fn remove(&self, key: &str) {
        match self.conn().await {
            Ok(mut conn) => {
                if let Err(e) = conn.del::<_, ()>(self.namespace.key(key)).await {
                    warn!(key = %key, error = %e, "Index delete failed");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Index delete failed"),
        }
    }

    /// Delete every index key under this namespace via cursor-based
    /// iteration. Errors surface.
    pub async fn clear(&self) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let deleted = delete_matching(&mut conn, &self.namespace.match_all()).await?;
        debug!(deleted, namespace = %self.namespace.fqn(), "Cleared index namespace");
        Ok(deleted)
    }

    /// Flush the entire logical database. Test-support escape hatch;
    /// fails soft.
    pub async fn clear_database(&self) {
        match self.conn().await {
            Ok(mut conn) => {
                if let Err(e) = redis::cmd("FLUSHDB").query_async::<()>(&mut *conn).await {
                    warn!(error = %e, "FLUSHDB failed");
                }
            }
            Err(e) => warn!(error = %e, "FLUSHDB failed"),
        }
    }
}
