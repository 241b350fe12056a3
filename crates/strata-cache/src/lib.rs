//! # Strata Cache
//!
//! Redis-backed caching subsystem for the Strata framework.
//!
//! The subsystem caches ephemeral data only: counters, serialized
//! documents, deduplicated log batches, and throttling markers. It is an
//! optimization, never a correctness dependency — every read path
//! degrades to a cache miss instead of propagating an error, and write
//! paths silently no-op on failure. The exceptions are counters and
//! explicit namespace-wide deletion, whose whole purpose is the side
//! effect: those surface failures as [`CacheError`].
//!
//! Components, leaf to root:
//! - [`connection`] — pool construction from a DSN, owned by the
//!   application's composition root and injected into every cache.
//! - [`namespace`] — deterministic `{prefix}_{tag}_{env}` key scoping.
//! - [`value`] — typed get/set/delete/incr/decr with TTL handling.
//! - [`reference`] — two-level indirection: compact index entries
//!   resolved against a separate payload cache in single scripted
//!   round trips.
//! - [`variable`] — typed scalar facades on internal (per-project) and
//!   shared (application-wide) scopes.
//! - [`log_cache`] — per-trace batching of recent log records.

pub mod config;
pub mod connection;
pub mod error;
pub mod log_cache;
pub mod namespace;
pub mod reference;
mod scripts;
pub mod ttl;
pub mod value;
pub mod variable;

pub use config::RedisCacheConfig;
pub use connection::{create_pool, create_pool_with_database, with_database};
pub use error::{CacheError, CacheResult};
pub use log_cache::{LogRecord, TraceLogCache};
pub use namespace::{CacheTag, KeyNamespace};
pub use reference::ReferenceCache;
pub use ttl::{Ttl, DEFAULT_TTL};
pub use value::{ValueCache, WriteBatch};
pub use variable::{VariableCache, VariableScope};

// Re-export the pool type so consumers don't need a direct deadpool dependency.
pub use deadpool_redis::Pool;
