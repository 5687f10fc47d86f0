//! Last-write-time values.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A UTC instant with microsecond precision, stored as microseconds since the
/// Unix epoch.
///
/// Assets contributed by regular packages never change during a session and
/// carry [`UTC_MIN_VALUE`] instead of a real file time.
///
/// # Examples
///
/// ```
/// use ckl_core::{Timestamp, UTC_MIN_VALUE};
///
/// let t = Timestamp::from_micros(1_700_000_000_000_000);
/// assert!(t > UTC_MIN_VALUE);
/// assert!(UTC_MIN_VALUE.is_min());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

/// Sentinel last-write-time for non-local resources.
pub const UTC_MIN_VALUE: Timestamp = Timestamp(i64::MIN);

impl Timestamp {
    /// Creates a timestamp from microseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns the microseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Returns `true` for the [`UTC_MIN_VALUE`] sentinel.
    #[inline]
    #[must_use]
    pub const fn is_min(self) -> bool {
        self.0 == i64::MIN
    }

    /// Converts a [`SystemTime`], saturating outside the representable range.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self(i64::try_from(after.as_micros()).unwrap_or(i64::MAX)),
            Err(before) => Self(
                i64::try_from(before.duration().as_micros())
                    .map_or(i64::MIN + 1, |micros| -micros),
            ),
        }
    }
}
