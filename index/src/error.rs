use thiserror::Error;

use vpower_power::FetchError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search index request failed: {0}")]
    RequestFailed(String),

    #[error("search index unreachable: {0}")]
    Unreachable(String),

    #[error("search index returned HTTP status {status} for {index}")]
    Status { index: String, status: u16 },

    #[error("invalid response from search index: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IndexError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            IndexError::Unreachable(format!("connection failed: {e}"))
        } else {
            IndexError::RequestFailed(e.to_string())
        }
    }
}

impl From<IndexError> for FetchError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::InvalidResponse(msg) => FetchError::Malformed(msg),
            IndexError::Status { index, status: 404 } => FetchError::NotFound(index),
            other => FetchError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_index_maps_to_not_found() {
        let err: FetchError = IndexError::Status {
            index: "bitshares-2019-04".into(),
            status: 404,
        }
        .into();
        assert!(matches!(err, FetchError::NotFound(ref index) if index == "bitshares-2019-04"));
    }

    #[test]
    fn other_statuses_are_unavailable() {
        let err: FetchError = IndexError::Status {
            index: "objects-voting-statistics".into(),
            status: 503,
        }
        .into();
        match err {
            FetchError::Unavailable(msg) => assert!(msg.contains("503"), "{msg}"),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }
}
