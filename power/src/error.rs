use thiserror::Error;
use vpower_types::Timestamp;

/// Failure reported by a [`SnapshotSource`](crate::SnapshotSource).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("snapshot source unavailable: {0}")]
    Unavailable(String),

    /// The source is reachable but the queried index does not exist.
    #[error("index not found: {0}")]
    NotFound(String),

    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("fetch failed for window [{start}, {end}): {source}")]
    Fetch {
        start: Timestamp,
        end: Timestamp,
        #[source]
        source: FetchError,
    },
}
