//! Typed variable caches.
//!
//! Thin facades over a [`ValueCache`] of scalar JSON values, mounted on
//! two logical scopes: `Internal` (per-project namespace, logical
//! database 2) and `Shared` (application-wide namespace, logical
//! database 1). Consumers use these for counters, flags, timestamps,
//! and alert-throttling markers.

use crate::namespace::{CacheTag, KeyNamespace};
use crate::ttl::{Ttl, DEFAULT_TTL};
use crate::value::ValueCache;
use deadpool_redis::Pool;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use strata_core::{AppContext, Clock};

/// Marker value stored for bare existence keys.
pub const DEFAULT_MARKER: &str = "1";

/// Logical scope of a variable cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    /// Scoped to one project; lives on logical database 2.
    Internal,
    /// Shared across the whole application; lives on logical database 1.
    Shared,
}

impl VariableScope {
    /// Logical Redis database this scope lives on.
    #[must_use]
    pub const fn database(self) -> u8 {
        match self {
            Self::Internal => 2,
            Self::Shared => 1,
        }
    }

    const fn tag(self) -> CacheTag {
        match self {
            Self::Internal => CacheTag::new("internal_variable"),
            Self::Shared => CacheTag::new("shared_variable"),
        }
    }

    fn namespace_prefix(self, context: &AppContext) -> &str {
        match self {
            Self::Internal => context.project(),
            Self::Shared => "shared",
        }
    }
}

/// Typed accessors for scalar cache variables.
pub struct VariableCache {
    inner: ValueCache<Value>,
    scope: VariableScope,
}

impl VariableCache {
    /// Creates a variable cache on the given scope.
    ///
    /// The pool must point at the scope's logical database; build it
    /// with [`crate::create_pool_with_database`] and
    /// [`VariableScope::database`].
    #[must_use]
    pub fn new(pool: Pool, context: &AppContext, scope: VariableScope) -> Self {
        let namespace = KeyNamespace::new(
            scope.namespace_prefix(context),
            scope.tag(),
            context.env(),
        );
        Self {
            inner: ValueCache::new(pool, namespace),
            scope,
        }
    }

    /// The scope this cache is mounted on.
    #[must_use]
    pub fn scope(&self) -> VariableScope {
        self.scope
    }

    /// The namespace all variables of this cache live under.
    #[must_use]
    pub fn namespace(&self) -> &KeyNamespace {
        self.inner.namespace()
    }

    /// Whether a readable value exists under `key`.
    pub async fn has_key(&self, key: &str) -> bool {
        self.inner.get(key).await.is_some()
    }

    /// Read an integer, falling back to `default` when the key is
    /// missing, unreadable, or not numeric.
    pub async fn read_int(&self, key: &str, default: i64) -> i64 {
        self.inner
            .get(key)
            .await
            .map_or(default, |value| coerce_int(&value, default))
    }

    /// Batched integer read; missing keys map to 0.
    pub async fn read_multiple_int(&self, keys: &[&str]) -> HashMap<String, i64> {
        let values = self.inner.get_many(keys, false).await;
        keys.iter()
            .map(|key| {
                let value = values
                    .get(*key)
                    .and_then(|v| v.as_ref())
                    .map_or(0, |v| coerce_int(v, 0));
                ((*key).to_string(), value)
            })
            .collect()
    }

    /// Read a string variable.
    pub async fn read_string(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Read a string variable, falling back to `default`.
    pub async fn read_string_or(&self, key: &str, default: &str) -> String {
        self.read_string(key).await.unwrap_or_else(|| default.to_string())
    }

    /// Read a timestamp stored as an ISO-8601 string. An unparseable
    /// value reads as a miss.
    pub async fn read_clock(&self, key: &str) -> Option<Clock> {
        let raw = self.read_string(key).await?;
        Clock::parse(&raw).ok()
    }

    pub async fn save_int(&self, key: &str, value: i64, ttl: Ttl) {
        self.inner.set(key, &Value::from(value), ttl).await;
    }

    pub async fn save_string(&self, key: &str, value: &str, ttl: Ttl) {
        self.inner.set(key, &Value::String(value.to_string()), ttl).await;
    }

    /// Store a timestamp as an ISO-8601 string.
    pub async fn save_clock(&self, key: &str, value: &Clock, ttl: Ttl) {
        self.save_string(key, &value.iso8601(), ttl).await;
    }

    /// Store the bare existence marker under `key`.
    pub async fn save_key(&self, key: &str, ttl: Ttl) {
        self.save_string(key, DEFAULT_MARKER, ttl).await;
    }

    pub async fn delete_key(&self, key: &str) {
        self.inner.remove(key).await;
    }

    /// Re-persist the current value (or the bare marker) with a fresh
    /// TTL, without changing it. Returns whether the key was newly
    /// created.
    ///
    /// Read and write are two separate steps; this is not atomic.
    pub async fn refresh_key(&self, key: &str, ttl: Ttl) -> bool {
        let current = self.inner.get(key).await;
        let is_new = current.is_none();
        let value = current.unwrap_or_else(|| Value::String(DEFAULT_MARKER.to_string()));
        self.inner.set(key, &value, ttl).await;
        is_new
    }

    /// Guarded-once execution: if `key` is absent, mark it, then run the
    /// thunk.
    ///
    /// This is NOT a distributed lock. Existence check and marking are
    /// two separate round trips, so two callers racing on a cold key can
    /// both run the thunk; it is best-effort de-duplication for
    /// idempotent side effects only. If true mutual exclusion is ever
    /// needed, use the store's atomic SET NX primitive instead.
    pub async fn execute_if_not_exists<F, Fut>(&self, key: &str, ttl: Ttl, thunk: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.has_key(key).await {
            return;
        }
        self.save_key(key, ttl).await;
        thunk().await;
    }

    /// Guarded-once execution with the default 5-minute window.
    pub async fn execute_if_not_exists_default<F, Fut>(&self, key: &str, thunk: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.execute_if_not_exists(key, DEFAULT_TTL, thunk).await;
    }

    /// Atomic counter increment; errors surface.
    pub async fn incr(&self, key: &str) -> crate::CacheResult<i64> {
        self.inner.incr(key).await
    }

    /// Atomic counter decrement; errors surface.
    pub async fn decr(&self, key: &str) -> crate::CacheResult<i64> {
        self.inner.decr(key).await
    }

    /// Delete every variable under this scope's namespace; errors
    /// surface.
    pub async fn clear(&self) -> crate::CacheResult<u64> {
        self.inner.clear().await
    }
}

/// Integer coercion for scalar variables: numbers pass through, numeric
/// strings parse, everything else falls back.
fn coerce_int(value: &Value, default: i64) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(default),
        Value::String(s) => s.parse().unwrap_or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_databases() {
        assert_eq!(VariableScope::Internal.database(), 2);
        assert_eq!(VariableScope::Shared.database(), 1);
    }

    #[test]
    fn test_scope_namespaces() {
        let ctx = AppContext::new("test", "billing");
        assert_eq!(VariableScope::Internal.namespace_prefix(&ctx), "billing");
        assert_eq!(VariableScope::Shared.namespace_prefix(&ctx), "shared");
        assert_ne!(
            VariableScope::Internal.tag().as_str(),
            VariableScope::Shared.tag().as_str()
        );
    }

    #[test]
    fn test_coerce_int_number() {
        assert_eq!(coerce_int(&Value::from(42), 0), 42);
    }

    #[test]
    fn test_coerce_int_numeric_string() {
        assert_eq!(coerce_int(&Value::String("42".into()), 0), 42);
    }

    #[test]
    fn test_coerce_int_fallback() {
        assert_eq!(coerce_int(&Value::String("nope".into()), 7), 7);
        assert_eq!(coerce_int(&Value::Bool(true), 7), 7);
    }
}
