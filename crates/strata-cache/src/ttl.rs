//! Time-to-live handling.

use strata_core::Clock;

/// Default TTL for cached entries (5 minutes).
pub const DEFAULT_TTL: Ttl = Ttl::Seconds(300);

/// Time-to-live for a cache entry.
///
/// Given either as remaining seconds or as a future instant converted
/// to remaining seconds at write time. Zero and negative values are
/// uniformly clamped to 1 second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Remaining seconds.
    Seconds(i64),
    /// Expire at the given instant.
    Until(Clock),
}

impl Ttl {
    /// Remaining whole seconds, clamped to a minimum of 1.
    #[must_use]
    pub fn as_secs(&self) -> u64 {
        let secs = match self {
            Self::Seconds(secs) => *secs,
            Self::Until(instant) => instant.diff_seconds(&Clock::now()),
        };
        secs.max(1) as u64
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Self::Seconds(secs)
    }
}

impl From<Clock> for Ttl {
    fn from(instant: Clock) -> Self {
        Self::Until(instant)
    }
}
