//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::ValidationError;

/// Immutable point in time, always UTC.
///
/// Deserializes from every shape the backend has been observed to emit:
/// RFC 3339 strings, naive ISO local date-times (taken as UTC), epoch
/// milliseconds, and Jackson's `[year, month, day, hour, minute, second, nanos]`
/// arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp offset by the given number of seconds.
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Self(self.0 + Duration::seconds(seconds))
    }

    /// Parses a textual timestamp (RFC 3339 or naive local date-time).
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(Self(naive.and_utc()));
            }
        }
        Err(ValidationError::invalid_format(
            "timestamp",
            format!("unrecognized date-time '{}'", text),
        ))
    }

    fn from_parts(parts: &[i64]) -> Result<Self, ValidationError> {
        if parts.len() < 3 {
            return Err(ValidationError::invalid_format(
                "timestamp",
                "date-time array needs at least year, month and day",
            ));
        }
        let part = |i: usize| parts.get(i).copied().unwrap_or(0);
        let to_u32 = |v: i64| u32::try_from(v).ok();
        let invalid = || ValidationError::invalid_format("timestamp", "date-time array out of range");

        let date = NaiveDate::from_ymd_opt(
            i32::try_from(part(0)).map_err(|_| invalid())?,
            to_u32(part(1)).ok_or_else(invalid)?,
            to_u32(part(2)).ok_or_else(invalid)?,
        )
        .ok_or_else(invalid)?;
        let datetime = date
            .and_hms_nano_opt(
                to_u32(part(3)).ok_or_else(invalid)?,
                to_u32(part(4)).ok_or_else(invalid)?,
                to_u32(part(5)).ok_or_else(invalid)?,
                to_u32(part(6)).ok_or_else(invalid)?,
            )
            .ok_or_else(invalid)?;
        Ok(Self(datetime.and_utc()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Text(String),
    Millis(i64),
    Parts(Vec<i64>),
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match WireTimestamp::deserialize(deserializer)? {
            WireTimestamp::Text(text) => Timestamp::parse(&text).map_err(serde::de::Error::custom),
            WireTimestamp::Millis(millis) => Timestamp::from_millis(millis)
                .ok_or_else(|| serde::de::Error::custom("epoch millis out of range")),
            WireTimestamp::Parts(parts) => {
                Timestamp::from_parts(&parts).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn now_creates_current_timestamp() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn is_before_and_after_compare_correctly() {
        let earlier = Timestamp::from_millis(1_000).unwrap();
        let later = Timestamp::from_millis(2_000).unwrap();

        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
        assert!(!earlier.is_after(&later));
    }

    #[test]
    fn deserializes_rfc3339() {
        let ts: Timestamp = serde_json::from_str("\"2024-03-01T10:15:00Z\"").unwrap();
        assert_eq!(ts.as_datetime().hour(), 10);
    }

    #[test]
    fn deserializes_naive_local_datetime_as_utc() {
        let ts: Timestamp = serde_json::from_str("\"2024-03-01T10:15:30.123\"").unwrap();
        assert_eq!(ts.as_datetime().minute(), 15);
        assert_eq!(ts.as_datetime().second(), 30);
    }

    #[test]
    fn deserializes_jackson_array() {
        let ts: Timestamp = serde_json::from_str("[2024, 3, 1, 10, 15, 30, 0]").unwrap();
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().month(), 3);
        assert_eq!(ts.as_datetime().hour(), 10);
    }

    #[test]
    fn deserializes_epoch_millis() {
        let ts: Timestamp = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(ts, Timestamp::from_millis(1_700_000_000_000).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Timestamp>("\"yesterday-ish\"").is_err());
        assert!(serde_json::from_str::<Timestamp>("[2024, 13, 40]").is_err());
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let ts = Timestamp::from_millis(0).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.starts_with("\"1970-01-01T00:00:00"));
    }
}
