//! The snapshot data source the engine reads from.

use std::future::Future;

use vpower_types::{Snapshot, Subject, Timestamp};

use crate::FetchError;

/// Read-only access to voting-power snapshots.
///
/// Production uses the search-index client; tests use the in-memory
/// nullable source.
pub trait SnapshotSource: Send + Sync {
    /// The snapshot of `subject` with the greatest block time in
    /// `[window_start, window_end)`, or `None` if there is none.
    ///
    /// Must never return more than one snapshot.
    fn fetch_latest(
        &self,
        subject: &Subject,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> impl Future<Output = Result<Option<Snapshot>, FetchError>> + Send;

    /// The newest `limit` snapshots of `subject`, returned oldest first.
    fn fetch_history(
        &self,
        subject: &Subject,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Snapshot>, FetchError>> + Send;

    /// Block time of the newest block the source has indexed, if it can tell.
    fn head_block_time(
        &self,
    ) -> impl Future<Output = Result<Option<Timestamp>, FetchError>> + Send {
        async { Ok(None) }
    }
}
