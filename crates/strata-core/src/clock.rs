//! UTC wall-clock value type.

use crate::{StrataError, StrataResult};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An immutable UTC instant with second precision.
///
/// `Clock` is the framework's single representation of wall-clock time.
/// It round-trips through ISO-8601 strings, which is also how clock
/// values are persisted in the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Clock(DateTime<Utc>);

impl Clock {
    /// Returns the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Builds a clock from a Unix timestamp in seconds.
    pub fn from_timestamp(secs: i64) -> StrataResult<Self> {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(Self)
            .ok_or_else(|| StrataError::validation(format!("invalid timestamp: {secs}")))
    }

    /// Parses an ISO-8601 / RFC 3339 string.
    pub fn parse(value: &str) -> StrataResult<Self> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| StrataError::validation(format!("invalid datetime '{value}': {e}")))
    }

    /// Formats as an ISO-8601 string, e.g. `2026-08-07T12:00:00+00:00`.
    #[must_use]
    pub fn iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Unix timestamp in seconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// Returns a clock shifted by the given number of seconds.
    #[must_use]
    pub fn add_seconds(self, secs: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(secs))
    }

    /// Seconds between `self` and `other`; positive when `self` is later.
    #[must_use]
    pub fn diff_seconds(&self, other: &Self) -> i64 {
        self.timestamp() - other.timestamp()
    }

    /// Whether `self` is strictly after `other`.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self.timestamp() > other.timestamp()
    }

    /// Whether `self` is strictly before `other`.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.timestamp() < other.timestamp()
    }
}

impl std::fmt::Display for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iso8601())
    }
}
