//! Cache error types.

use strata_core::StrataError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connection could not be established. Without a connection no
    /// operation can proceed, so construction failures all wrap into
    /// this one kind.
    #[error("Failed to connect to Redis: {0}")]
    Connection(String),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Redis command error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server-side script error.
    #[error("Script error: {0}")]
    Script(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Returns true if this error comes from the transport rather than
    /// from the cached data itself.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Pool(_) | Self::Redis(_) | Self::Script(_)
        )
    }
}

impl From<CacheError> for StrataError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Configuration(msg) => StrataError::Configuration(msg),
            other => StrataError::Cache(other.to_string()),
        }
    }
}
