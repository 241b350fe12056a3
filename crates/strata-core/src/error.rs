//! Unified error types for all layers of the framework.

use thiserror::Error;

/// Unified error type for the Strata framework.
///
/// Every subsystem error converges on this enum at the application
/// boundary. Subsystem crates define their own narrower error types and
/// bridge into this one.
#[derive(Error, Debug)]
pub enum StrataError {
    // ============ Domain Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis/Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StrataError::not_found("user", "42");
        let msg = err.to_string();
        assert!(msg.contains("user") && msg.contains("42"));
    }

    #[test]
    fn test_error_code_cache() {
        let err = StrataError::cache("connection refused");
        assert_eq!(err.error_code(), "CACHE_ERROR");
    }

    #[test]
    fn test_error_code_validation() {
        let err = StrataError::validation("empty key");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_cache_is_retriable() {
        assert!(StrataError::cache("timeout").is_retriable());
        assert!(!StrataError::validation("bad input").is_retriable());
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<i64>("not a number").unwrap_err();
        let err = StrataError::from(json_err);
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_from_anyhow() {
        let err = StrataError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert!(err.to_string().contains("boom"));
    }
}
