//! Timestamp type used for windowing and block times.
//!
//! Timestamps are UTC instants with nanosecond resolution. Window arithmetic
//! works on whole nanoseconds since the Unix epoch so that arbitrarily narrow
//! windows never divide by zero or lose ordering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::TypeError;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A UTC instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build a timestamp from whole seconds since the Unix epoch.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Build a timestamp from milliseconds since the Unix epoch, the unit
    /// search-index aggregations report dates in.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Build a timestamp from nanoseconds since the Unix epoch.
    pub fn from_unix_nanos(nanos: i128) -> Option<Self> {
        let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SEC)).ok()?;
        let subsec = nanos.rem_euclid(NANOS_PER_SEC) as u32;
        DateTime::from_timestamp(secs, subsec).map(Self)
    }

    /// Nanoseconds since the Unix epoch.
    pub fn unix_nanos(&self) -> i128 {
        self.0.timestamp() as i128 * NANOS_PER_SEC + self.0.timestamp_subsec_nanos() as i128
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// This timestamp shifted `days` whole days into the past.
    pub fn days_before(&self, days: i64) -> Result<Self, TypeError> {
        TimeDelta::try_days(days)
            .and_then(|delta| self.0.checked_sub_signed(delta))
            .map(Self)
            .ok_or(TypeError::TimestampOutOfRange)
    }

    /// Seconds elapsed between `self` and a later `now` (negative if `now` is earlier).
    pub fn secs_until(&self, now: Timestamp) -> f64 {
        (now.unix_nanos() - self.unix_nanos()) as f64 / NANOS_PER_SEC as f64
    }

    /// Parse a timestamp in any of the formats accepted on the HTTP API and
    /// stored in the search index.
    ///
    /// Accepted: RFC 3339 (`2019-04-06T15:00:00Z`, with offset or fraction),
    /// naive `2019-04-06T15:00:00[.fff]` interpreted as UTC, and a bare date
    /// `2019-04-06` meaning midnight UTC.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self(naive.and_utc()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Self(naive.and_utc()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(naive.and_utc()));
            }
        }
        Err(TypeError::InvalidTimestamp(s.to_string()))
    }

    /// RFC 3339 rendering in UTC with only as many fractional digits as needed.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_naive_index_format_as_utc() {
        let ts = Timestamp::parse("2019-04-06T15:00:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2019-04-06T15:00:00Z");
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let ts = Timestamp::parse("2015-10-10").unwrap();
        assert_eq!(ts, Timestamp::parse("2015-10-10T00:00:00Z").unwrap());
    }

    #[test]
    fn parses_offsets_into_utc() {
        let ts = Timestamp::parse("2019-07-13T08:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2019-07-13T06:00:00Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("last tuesday"),
            Err(TypeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn nanos_round_trip_before_epoch() {
        let ts = Timestamp::from_unix_nanos(-1_500_000_000).unwrap();
        assert_eq!(ts.unix_nanos(), -1_500_000_000);
        assert_eq!(ts.to_rfc3339(), "1969-12-31T23:59:58.500Z");
    }

    #[test]
    fn days_before_shifts_whole_days() {
        let to = Timestamp::parse("2019-07-13T06:00:00").unwrap();
        let from = to.days_before(730).unwrap();
        assert_eq!(from.to_rfc3339(), "2017-07-13T06:00:00Z");
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let ts = Timestamp::from_unix_secs(0).unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"1970-01-01T00:00:00Z\"");
        let back: Timestamp = serde_json::from_str("\"1970-01-01T00:00:00\"").unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn secs_until_is_signed() {
        let a = Timestamp::from_unix_secs(100).unwrap();
        let b = Timestamp::from_unix_secs(130).unwrap();
        assert_eq!(a.secs_until(b), 30.0);
        assert_eq!(b.secs_until(a), -30.0);
    }
}
