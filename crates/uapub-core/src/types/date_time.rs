use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};

use crate::error::{PubSubError, Result};

/// 100 ns intervals between 1601-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 11_644_473_600 * TICKS_PER_SECOND;
const TICKS_PER_SECOND: i64 = 10_000_000;
/// 9999-12-31T23:59:59Z.
const MAX_TICKS: i64 = (253_402_300_799 + 11_644_473_600) * TICKS_PER_SECOND;

const MIN_TEXT: &str = "0001-01-01T00:00:00Z";
const MAX_TEXT: &str = "9999-12-31T23:59:59Z";

/// OPC UA timestamp: 100 ns ticks since 1601-01-01T00:00:00Z (UTC).
///
/// Ticks at or below zero are the minimum sentinel and render as
/// `0001-01-01T00:00:00Z`; ticks at or past the end of year 9999 render as
/// `9999-12-31T23:59:59Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime {
    ticks: i64,
}

impl DateTime {
    /// Minimum-timestamp sentinel.
    pub const MIN: DateTime = DateTime { ticks: 0 };
    pub const MAX: DateTime = DateTime { ticks: MAX_TICKS };

    pub fn from_ticks(ticks: i64) -> Self {
        Self { ticks: ticks.clamp(0, MAX_TICKS) }
    }

    pub fn ticks(self) -> i64 {
        self.ticks
    }

    pub fn now() -> Self {
        Self::from_chrono(Utc::now())
    }

    pub fn is_min(self) -> bool {
        self.ticks == 0
    }

    pub fn from_chrono(dt: chrono::DateTime<Utc>) -> Self {
        let ticks = dt
            .timestamp()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(UNIX_EPOCH_TICKS))
            .and_then(|t| t.checked_add(i64::from(dt.timestamp_subsec_nanos() / 100)));
        match ticks {
            Some(t) => Self::from_ticks(t),
            None if dt.timestamp() < 0 => Self::MIN,
            None => Self::MAX,
        }
    }

    /// `None` for the sentinels, which have no UTC instant of their own.
    pub fn to_chrono(self) -> Option<chrono::DateTime<Utc>> {
        if self.ticks <= 0 || self.ticks >= MAX_TICKS {
            return None;
        }
        let unix = self.ticks - UNIX_EPOCH_TICKS;
        let secs = unix.div_euclid(TICKS_PER_SECOND);
        let nanos = (unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        chrono::DateTime::<Utc>::from_timestamp(secs, nanos)
    }

    /// JSON string form (RFC 3339, UTC).
    pub fn to_json_string(self) -> String {
        if self.ticks >= MAX_TICKS {
            return MAX_TEXT.to_string();
        }
        match self.to_chrono() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => MIN_TEXT.to_string(),
        }
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(dt: chrono::DateTime<Utc>) -> Self {
        Self::from_chrono(dt)
    }
}

impl FromStr for DateTime {
    type Err = PubSubError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            MIN_TEXT => return Ok(Self::MIN),
            MAX_TEXT => return Ok(Self::MAX),
            _ => {}
        }
        let dt = chrono::DateTime::parse_from_rfc3339(s)
            .map_err(|e| PubSubError::decode(format!("invalid timestamp {s:?}: {e}")))?;
        Ok(Self::from_chrono(dt.with_timezone(&Utc)))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_sentinel_text() {
        assert_eq!(DateTime::MIN.to_json_string(), "0001-01-01T00:00:00Z");
        assert_eq!(DateTime::from_ticks(-5), DateTime::MIN);
        assert_eq!(DateTime::MAX.to_json_string(), "9999-12-31T23:59:59Z");
    }

    #[test]
    fn unix_epoch_ticks() {
        let dt: DateTime = "1970-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(dt.ticks(), 116_444_736_000_000_000);
    }

    #[test]
    fn fractional_seconds_survive_text_form() {
        let dt: DateTime = "2024-05-01T12:30:15.25Z".parse().unwrap();
        assert_eq!(dt.to_json_string(), "2024-05-01T12:30:15.250Z");
        let back: DateTime = dt.to_json_string().parse().unwrap();
        assert_eq!(back, dt);
    }

    #[test]
    fn whole_seconds_have_no_fraction() {
        let dt: DateTime = "2024-05-01T12:00:00+02:00".parse().unwrap();
        assert_eq!(dt.to_json_string(), "2024-05-01T10:00:00Z");
    }

    #[test]
    fn rejects_garbage() {
        let err = "yesterday".parse::<DateTime>().unwrap_err();
        assert_eq!(err.code().as_str(), "DECODE");
    }
}
