//! Microsecond-precision timestamp type
//!
//! Timestamps are stored as microseconds since the Unix epoch. This gives
//! sufficient precision for ordering attach/commit events and centuries of
//! range in a u64. Section expirations are expressed as absolute
//! timestamps, following the checkpoint-service convention that expiration
//! is a point in time, not a duration.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microsecond-precision timestamp
///
/// ## Invariants
///
/// - Always non-negative (u64) and always in microseconds
/// - The zero timestamp represents the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Maximum representable timestamp
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    /// Create a timestamp for the current moment
    ///
    /// Uses system time. Returns epoch (0) if the system clock reads
    /// before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from seconds since epoch
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Microseconds since epoch
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Add a duration, saturating at the maximum timestamp
    pub fn saturating_add(&self, d: Duration) -> Self {
        Timestamp(self.0.saturating_add(d.as_micros() as u64))
    }

    /// Duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is after `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0
            .checked_sub(earlier.0)
            .map(Duration::from_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now_after_epoch() {
        assert!(Timestamp::now() > Timestamp::EPOCH);
    }

    #[test]
    fn test_timestamp_from_secs() {
        assert_eq!(Timestamp::from_secs(1).as_micros(), 1_000_000);
    }

    #[test]
    fn test_timestamp_saturating_add() {
        let t = Timestamp::from_micros(10).saturating_add(Duration::from_micros(5));
        assert_eq!(t.as_micros(), 15);

        let max = Timestamp::MAX.saturating_add(Duration::from_secs(1));
        assert_eq!(max, Timestamp::MAX);
    }

    #[test]
    fn test_timestamp_duration_since() {
        let a = Timestamp::from_micros(100);
        let b = Timestamp::from_micros(250);
        assert_eq!(b.duration_since(a), Some(Duration::from_micros(150)));
        assert_eq!(a.duration_since(b), None);
    }
}
