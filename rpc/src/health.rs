//! Liveness report derived from the newest indexed block.

use serde::Serialize;

use vpower_power::FetchError;
use vpower_types::Timestamp;

/// A head block older than this many seconds means the indexer is behind.
pub const MAX_HEAD_AGE_SECS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    OutOfSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthError {
    #[serde(rename = "last_block_too_old")]
    LastBlockTooOld,
    #[serde(rename = "no_blocks_last_24_hours")]
    NoBlocksLast24Hours,
    #[serde(rename = "index_not_found")]
    IndexNotFound,
    #[serde(rename = "index_unreachable")]
    IndexUnreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub server_time: Timestamp,
    pub head_block_time: Option<Timestamp>,
    /// Seconds between server time and head block time.
    pub deltatime: Option<f64>,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<HealthError>,
}

impl HealthReport {
    pub fn evaluate(now: Timestamp, head: Result<Option<Timestamp>, FetchError>) -> Self {
        let out_of_sync = |head_block_time: Option<Timestamp>,
                           deltatime: Option<f64>,
                           error: HealthError| Self {
            server_time: now,
            head_block_time,
            deltatime,
            status: HealthStatus::OutOfSync,
            error: Some(error),
        };
        match head {
            Err(FetchError::NotFound(_)) => out_of_sync(None, None, HealthError::IndexNotFound),
            Err(_) => out_of_sync(None, None, HealthError::IndexUnreachable),
            Ok(None) => out_of_sync(None, None, HealthError::NoBlocksLast24Hours),
            Ok(Some(head)) => {
                let delta = head.secs_until(now).abs();
                if delta < MAX_HEAD_AGE_SECS {
                    Self {
                        server_time: now,
                        head_block_time: Some(head),
                        deltatime: Some(delta),
                        status: HealthStatus::Ok,
                        error: None,
                    }
                } else {
                    out_of_sync(Some(head), Some(delta), HealthError::LastBlockTooOld)
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    #[test]
    fn fresh_head_is_ok() {
        let report = HealthReport::evaluate(ts(1_000), Ok(Some(ts(990))));
        assert!(report.is_ok());
        assert_eq!(report.deltatime, Some(10.0));
        assert_eq!(report.error, None);
    }

    #[test]
    fn stale_head_is_out_of_sync() {
        let report = HealthReport::evaluate(ts(1_000), Ok(Some(ts(970))));
        assert_eq!(report.status, HealthStatus::OutOfSync);
        assert_eq!(report.error, Some(HealthError::LastBlockTooOld));
        assert_eq!(report.deltatime, Some(30.0));
    }

    #[test]
    fn no_blocks_and_unreachable() {
        let none = HealthReport::evaluate(ts(1_000), Ok(None));
        assert_eq!(none.error, Some(HealthError::NoBlocksLast24Hours));

        let down =
            HealthReport::evaluate(ts(1_000), Err(FetchError::Unavailable("refused".into())));
        assert_eq!(down.error, Some(HealthError::IndexUnreachable));
        assert!(!down.is_ok());
    }

    #[test]
    fn missing_monthly_index_is_not_found() {
        let report = HealthReport::evaluate(
            ts(1_000),
            Err(FetchError::NotFound("bitshares-1970-01".into())),
        );
        assert_eq!(report.status, HealthStatus::OutOfSync);
        assert_eq!(report.error, Some(HealthError::IndexNotFound));
        assert_eq!(
            serde_json::to_value(&report).unwrap()["error"],
            "index_not_found"
        );
    }

    #[test]
    fn serialized_shape() {
        let json = serde_json::to_value(HealthReport::evaluate(ts(0), Ok(None))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "server_time": "1970-01-01T00:00:00Z",
                "head_block_time": null,
                "deltatime": null,
                "status": "out_of_sync",
                "error": "no_blocks_last_24_hours",
            })
        );

        let ok = serde_json::to_value(HealthReport::evaluate(ts(5), Ok(Some(ts(4))))).unwrap();
        assert_eq!(ok["status"], "ok");
        assert!(ok.get("error").is_none());
    }
}
