//! Key namespacing.
//!
//! Every concrete cache derives a fully-qualified prefix
//! `{prefix}_{tag}_{env}` from an explicit, constructor-supplied tag.
//! Two cache kinds never collide on identical user keys, and different
//! environments never intermix data. The persisted layout
//! `{prefix}_{tag}_{env}:{userKey}` is a stable contract other tooling
//! may rely on.

use std::fmt;

/// Explicit type tag for a concrete cache.
///
/// One constant per cache kind; never derived from runtime type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheTag(&'static str);

impl CacheTag {
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Fully-qualified key namespace for one cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    fqn: String,
}

impl KeyNamespace {
    /// Derives the namespace `{prefix}_{tag}_{env}`. Deterministic and
    /// stable across restarts.
    #[must_use]
    pub fn new(prefix: &str, tag: CacheTag, env: &str) -> Self {
        Self {
            fqn: format!("{prefix}_{tag}_{env}"),
        }
    }

    /// The bare namespace prefix, without a trailing separator.
    #[must_use]
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Fully-qualified key for a user key.
    #[must_use]
    pub fn key(&self, user_key: &str) -> String {
        format!("{}:{user_key}", self.fqn)
    }

    /// The `{fqn}:` prefix, as passed to server-side scripts.
    #[must_use]
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.fqn)
    }

    /// Glob pattern matching every key in this namespace.
    #[must_use]
    pub fn match_all(&self) -> String {
        format!("{}:*", self.fqn)
    }

    /// Glob pattern matching keys starting with the given user prefix.
    #[must_use]
    pub fn match_prefix(&self, user_prefix: &str) -> String {
        format!("{}:{user_prefix}*", self.fqn)
    }
}
