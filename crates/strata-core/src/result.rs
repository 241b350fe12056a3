//! Result type aliases for Strata.

use crate::StrataError;

/// A specialized `Result` type for Strata operations.
pub type StrataResult<T> = Result<T, StrataError>;
