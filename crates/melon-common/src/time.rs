//! Wall-clock helpers.
//!
//! The engine never reads the clock itself. Hosts pass the current time as
//! milliseconds since the Unix epoch (`i64`) and the engine derives day keys
//! and minute deltas from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds in one minute.
pub const MS_PER_MINUTE: i64 = 60_000;

/// Milliseconds in one hour.
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Clamps a timestamp to a usable value: negative stamps become 0.
#[must_use]
pub fn sanitize_millis(ms: i64) -> i64 {
    ms.max(0)
}

/// Clamps a minute count: non-finite or negative values become 0, the rest
/// are floored to whole minutes.
#[must_use]
pub fn sanitize_minutes(minutes: f64) -> u32 {
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }
    minutes.floor().min(f64::from(u32::MAX)) as u32
}

/// Whole minutes between two timestamps, 0 if `later` is not after `earlier`.
#[must_use]
pub fn minutes_between(earlier: i64, later: i64) -> u32 {
    let delta = sanitize_millis(later) - sanitize_millis(earlier);
    if delta <= 0 {
        return 0;
    }
    (delta / MS_PER_MINUTE).min(i64::from(u32::MAX)) as u32
}

/// A calendar day key in `YYYY-MM-DD` form (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    /// Derives the day key for a ms-epoch timestamp.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        let date = DateTime::<Utc>::from_timestamp_millis(sanitize_millis(ms))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self(date.format("%Y-%m-%d").to_string())
    }

    /// Wraps an existing key string (e.g. one read from a save).
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_minutes() {
        assert_eq!(sanitize_minutes(f64::NAN), 0);
        assert_eq!(sanitize_minutes(f64::INFINITY), 0);
        assert_eq!(sanitize_minutes(-5.0), 0);
        assert_eq!(sanitize_minutes(12.9), 12);
    }

    #[test]
    fn test_minutes_between() {
        assert_eq!(minutes_between(0, 90 * MS_PER_MINUTE + 59_999), 90);
        assert_eq!(minutes_between(5_000, 1_000), 0);
        assert_eq!(minutes_between(-1, MS_PER_MINUTE), 1);
    }

    #[test]
    fn test_day_key_boundaries() {
        assert_eq!(DayKey::from_millis(MS_PER_DAY - 1).as_str(), "1970-01-01");
        assert_eq!(DayKey::from_millis(MS_PER_DAY).as_str(), "1970-01-02");
        // 2000-03-01T00:00:00Z
        assert_eq!(DayKey::from_millis(951_868_800_000).as_str(), "2000-03-01");
        assert_eq!(DayKey::from_millis(-500).as_str(), "1970-01-01");
        assert_eq!(DayKey::from_millis(i64::MAX).as_str(), "1970-01-01");
    }
}
