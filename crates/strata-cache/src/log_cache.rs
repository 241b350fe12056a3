//! Per-trace batching of recent log records.
//!
//! The logging pipeline buffers the most recent records per trace id in
//! the shared scope, then drains the batch when the trace completes.

use crate::namespace::{CacheTag, KeyNamespace};
use crate::ttl::Ttl;
use crate::value::ValueCache;
use deadpool_redis::Pool;
use serde::{Deserialize, Serialize};
use strata_core::AppContext;

/// Most recent records kept per trace.
const WINDOW: usize = 20;

/// Batch TTL (5 minutes).
const LOG_TTL: Ttl = Ttl::Seconds(300);

/// One buffered log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub project: String,
    pub payload: serde_json::Value,
    pub labels: Option<Vec<String>>,
}

/// Cache of recent log records, batched per trace id.
pub struct TraceLogCache {
    inner: ValueCache<Vec<LogRecord>>,
}

impl TraceLogCache {
    /// Creates the trace-log cache on the shared scope.
    #[must_use]
    pub fn new(pool: Pool, context: &AppContext) -> Self {
        let namespace = KeyNamespace::new("shared", CacheTag::new("trace_log"), context.env());
        Self {
            inner: ValueCache::new(pool, namespace),
        }
    }

    /// Append a record to the trace's batch, keeping only the most
    /// recent [`WINDOW`] records. Fails soft.
    pub async fn add_record(&self, trace_id: &str, record: LogRecord) {
        let mut records = self.inner.get(trace_id).await.unwrap_or_default();
        records.push(record);
        if records.len() > WINDOW {
            records.drain(..records.len() - WINDOW);
        }
        self.inner.set(trace_id, &records, LOG_TTL).await;
    }

    /// Drain the trace's batch: return the buffered records and remove
    /// them. Fails soft (an unreachable cache drains as empty).
    pub async fn take_records(&self, trace_id: &str) -> Vec<LogRecord> {
        let records = self.inner.get(trace_id).await.unwrap_or_default();
        self.inner.remove(trace_id).await;
        records
    }
}
