//! Query-string parameters for the power endpoints.

use serde::Deserialize;

use vpower_types::Timestamp;

use crate::RpcError;

/// Default `datapoints` when not specified.
pub const DEFAULT_DATAPOINTS: usize = 100;

/// Maximum allowed `datapoints`.
pub const MAX_DATAPOINTS: usize = 700;

/// Default number of snapshots returned by `/get_voted_workers_over_time`.
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Default lookback when `from` is not specified.
pub const DEFAULT_RANGE_DAYS: i64 = 730;

/// Parameters accepted by `/get_account_power_over_time` and
/// `/get_worker_power_over_time`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowerQuery {
    pub account: Option<String>,
    pub vote_id: Option<String>,
    /// Timestamp or `now`.
    pub from: Option<String>,
    /// Timestamp or `now`.
    pub to: Option<String>,
    pub datapoints: Option<String>,
}

/// Parameters accepted by `/get_voted_workers_over_time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VotesQuery {
    pub account: Option<String>,
    /// Number of most recent snapshots to return.
    pub size: Option<String>,
}

/// Server-side defaults and bounds applied to every power query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_datapoints: usize,
    pub max_datapoints: usize,
    pub default_range_days: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_datapoints: DEFAULT_DATAPOINTS,
            max_datapoints: MAX_DATAPOINTS,
            default_range_days: DEFAULT_RANGE_DAYS,
        }
    }
}

/// A fully resolved request range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub from: Timestamp,
    pub to: Timestamp,
    pub datapoints: usize,
}

impl QueryLimits {
    /// Fill in defaults relative to `now` and clamp `datapoints` to
    /// `[1, max_datapoints]`.
    pub fn resolve(&self, query: &PowerQuery, now: Timestamp) -> Result<ResolvedRange, RpcError> {
        let to = match query.to.as_deref() {
            Some(raw) => parse_time("to", raw, now)?,
            None => now,
        };
        let from = match query.from.as_deref() {
            Some(raw) => parse_time("from", raw, now)?,
            None => to.days_before(self.default_range_days).map_err(|e| {
                RpcError::InvalidRequest(format!("cannot derive default `from`: {e}"))
            })?,
        };
        Ok(ResolvedRange {
            from,
            to,
            datapoints: self.effective_datapoints(query.datapoints.as_deref())?,
        })
    }

    pub fn effective_datapoints(&self, raw: Option<&str>) -> Result<usize, RpcError> {
        let max = self.max_datapoints.max(1);
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(self.default_datapoints.clamp(1, max));
        };
        let requested: i64 = raw.parse().map_err(|_| {
            RpcError::InvalidRequest(format!("`datapoints` is not an integer: {raw:?}"))
        })?;
        Ok(usize::try_from(requested.max(1)).unwrap_or(max).min(max))
    }

    /// `size` for the vote history, clamped to `[1, max_datapoints]`.
    pub fn effective_history_size(&self, raw: Option<&str>) -> Result<usize, RpcError> {
        let max = self.max_datapoints.max(1);
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(DEFAULT_HISTORY_SIZE.clamp(1, max));
        };
        let requested: i64 = raw
            .parse()
            .map_err(|_| RpcError::InvalidRequest(format!("`size` is not an integer: {raw:?}")))?;
        Ok(usize::try_from(requested.max(1)).unwrap_or(max).min(max))
    }
}

fn parse_time(name: &str, raw: &str, now: Timestamp) -> Result<Timestamp, RpcError> {
    if raw.trim().eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    Timestamp::parse(raw).map_err(|e| RpcError::InvalidRequest(format!("`{name}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn query(from: Option<&str>, to: Option<&str>, datapoints: Option<&str>) -> PowerQuery {
        PowerQuery {
            from: from.map(String::from),
            to: to.map(String::from),
            datapoints: datapoints.map(String::from),
            ..PowerQuery::default()
        }
    }

    #[test]
    fn defaults_cover_two_years_up_to_now() {
        let now = ts("2019-04-06T15:00:00Z");
        let range = QueryLimits::default().resolve(&query(None, None, None), now).unwrap();
        assert_eq!(range.to, now);
        assert_eq!(range.from, ts("2017-04-06T15:00:00Z"));
        assert_eq!(range.datapoints, DEFAULT_DATAPOINTS);
    }

    #[test]
    fn explicit_dates_and_now() {
        let now = ts("2019-04-06T15:00:00Z");
        let range = QueryLimits::default()
            .resolve(&query(Some("2019-01-01"), Some("now"), Some("12")), now)
            .unwrap();
        assert_eq!(range.from, ts("2019-01-01T00:00:00Z"));
        assert_eq!(range.to, now);
        assert_eq!(range.datapoints, 12);
    }

    #[test]
    fn default_from_is_relative_to_explicit_to() {
        let range = QueryLimits::default()
            .resolve(&query(None, Some("2019-01-01"), None), Timestamp::now())
            .unwrap();
        assert_eq!(range.from, ts("2017-01-01"));
    }

    #[test]
    fn datapoints_clamped() {
        let limits = QueryLimits::default();
        assert_eq!(limits.effective_datapoints(Some("0")).unwrap(), 1);
        assert_eq!(limits.effective_datapoints(Some("-5")).unwrap(), 1);
        assert_eq!(limits.effective_datapoints(Some("5000")).unwrap(), MAX_DATAPOINTS);
        assert_eq!(limits.effective_datapoints(Some(" 7 ")).unwrap(), 7);
        assert_eq!(limits.effective_datapoints(Some("")).unwrap(), DEFAULT_DATAPOINTS);
    }

    #[test]
    fn history_size_defaults_and_clamps() {
        let limits = QueryLimits::default();
        assert_eq!(limits.effective_history_size(None).unwrap(), DEFAULT_HISTORY_SIZE);
        assert_eq!(limits.effective_history_size(Some("0")).unwrap(), 1);
        assert_eq!(limits.effective_history_size(Some("9999")).unwrap(), MAX_DATAPOINTS);
        assert!(limits.effective_history_size(Some("ten")).is_err());
    }

    #[test]
    fn default_datapoints_respects_max() {
        let limits = QueryLimits {
            max_datapoints: 50,
            ..QueryLimits::default()
        };
        assert_eq!(limits.effective_datapoints(None).unwrap(), 50);
    }

    #[test]
    fn unparseable_values_are_invalid_requests() {
        let limits = QueryLimits::default();
        let now = Timestamp::now();
        assert!(matches!(
            limits.resolve(&query(Some("last tuesday"), None, None), now),
            Err(RpcError::InvalidRequest(_))
        ));
        assert!(matches!(
            limits.resolve(&query(None, None, Some("many")), now),
            Err(RpcError::InvalidRequest(_))
        ));
    }
}
