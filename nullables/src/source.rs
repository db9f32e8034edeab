//! Nullable snapshot source: thread-safe in-memory snapshots for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use vpower_power::{FetchError, SnapshotSource};
use vpower_types::{Snapshot, Subject, Timestamp};

/// An in-memory [`SnapshotSource`].
///
/// Answers window queries the way the search index does: the matching
/// snapshot with the greatest block time (ties broken by block number) in
/// `[start, end)`. Failures and latency can be injected, and every query is
/// counted and recorded.
pub struct NullSnapshotSource {
    snapshots: Mutex<Vec<Snapshot>>,
    head: Mutex<Option<Timestamp>>,
    head_error: Mutex<Option<FetchError>>,
    /// Fail this many upcoming fetches.
    fail_next: AtomicUsize,
    fail_always: Mutex<bool>,
    delay: Mutex<Duration>,
    fetches: AtomicUsize,
    queried: Mutex<Vec<(Subject, Timestamp, Timestamp)>>,
}

impl NullSnapshotSource {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
            head: Mutex::new(None),
            head_error: Mutex::new(None),
            fail_next: AtomicUsize::new(0),
            fail_always: Mutex::new(false),
            delay: Mutex::new(Duration::ZERO),
            fetches: AtomicUsize::new(0),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn with_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let source = Self::new();
        source.insert_all(snapshots);
        source
    }

    pub fn insert(&self, snapshot: Snapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    pub fn insert_all(&self, snapshots: impl IntoIterator<Item = Snapshot>) {
        self.snapshots.lock().unwrap().extend(snapshots);
    }

    /// Replace every stored snapshot, simulating upstream data changing.
    pub fn replace_all(&self, snapshots: impl IntoIterator<Item = Snapshot>) {
        *self.snapshots.lock().unwrap() = snapshots.into_iter().collect();
    }

    pub fn set_head_block_time(&self, head: Option<Timestamp>) {
        *self.head.lock().unwrap() = head;
    }

    /// Answer head queries with `error` until cleared.
    pub fn set_head_error(&self, error: Option<FetchError>) {
        *self.head_error.lock().unwrap() = error;
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Make every fetch (and head query) fail until turned off.
    pub fn set_fail_always(&self, fail: bool) {
        *self.fail_always.lock().unwrap() = fail;
    }

    /// Delay every fetch, to widen race windows in concurrency tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Fetches attempted so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Every `(subject, start, end)` queried, in call order.
    pub fn queried(&self) -> Vec<(Subject, Timestamp, Timestamp)> {
        self.queried.lock().unwrap().clone()
    }

    pub fn reset_counters(&self) {
        self.fetches.store(0, Ordering::SeqCst);
        self.queried.lock().unwrap().clear();
    }

    fn should_fail(&self) -> bool {
        if *self.fail_always.lock().unwrap() {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn latest(&self, subject: &Subject, start: Timestamp, end: Timestamp) -> Option<Snapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| subject.matches(s) && s.block_time >= start && s.block_time < end)
            .max_by_key(|s| (s.block_time, s.block_number))
            .cloned()
    }

    fn history(&self, subject: &Subject, limit: usize) -> Vec<Snapshot> {
        let mut found: Vec<Snapshot> = self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| subject.matches(s))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.block_time, s.block_number));
        let skip = found.len().saturating_sub(limit);
        found.split_off(skip)
    }
}

impl Default for NullSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for NullSnapshotSource {
    async fn fetch_latest(
        &self,
        subject: &Subject,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Option<Snapshot>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.queried
            .lock()
            .unwrap()
            .push((subject.clone(), window_start, window_end));

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail() {
            return Err(FetchError::Unavailable("null source failure injected".into()));
        }
        Ok(self.latest(subject, window_start, window_end))
    }

    async fn fetch_history(
        &self,
        subject: &Subject,
        limit: usize,
    ) -> Result<Vec<Snapshot>, FetchError> {
        if self.should_fail() {
            return Err(FetchError::Unavailable("null source failure injected".into()));
        }
        Ok(self.history(subject, limit))
    }

    async fn head_block_time(&self) -> Result<Option<Timestamp>, FetchError> {
        if *self.fail_always.lock().unwrap() {
            return Err(FetchError::Unavailable("null source failure injected".into()));
        }
        if let Some(err) = self.head_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(*self.head.lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpower_types::PROXY_TO_SELF;

    fn snap(account: &str, block: u64, secs: i64) -> Snapshot {
        Snapshot {
            account_id: account.into(),
            stake: block,
            proxy_id: PROXY_TO_SELF.into(),
            proxy_for: Vec::new(),
            votes: vec!["1:0".into()],
            block_number: block,
            block_time: Timestamp::from_unix_secs(secs).unwrap(),
        }
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(secs).unwrap()
    }

    #[tokio::test]
    async fn returns_latest_in_half_open_window() {
        let source = NullSnapshotSource::with_snapshots(vec![
            snap("a", 1, 10),
            snap("a", 2, 20),
            snap("a", 3, 30),
            snap("b", 4, 25),
        ]);
        let a = Subject::account("a").unwrap();

        let found = source.fetch_latest(&a, ts(10), ts(30)).await.unwrap();
        assert_eq!(found.map(|s| s.block_number), Some(2));
        assert!(source.fetch_latest(&a, ts(31), ts(40)).await.unwrap().is_none());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn worker_subject_matches_votes() {
        let source = NullSnapshotSource::with_snapshots(vec![snap("a", 1, 10), snap("b", 2, 11)]);
        let worker = Subject::worker("1:0").unwrap();
        let found = source.fetch_latest(&worker, ts(0), ts(100)).await.unwrap();
        assert_eq!(found.map(|s| s.account_id), Some("b".to_string()));
    }

    #[tokio::test]
    async fn history_keeps_newest_in_block_order() {
        let source = NullSnapshotSource::with_snapshots(vec![
            snap("a", 3, 30),
            snap("a", 1, 10),
            snap("b", 4, 25),
            snap("a", 2, 20),
        ]);
        let a = Subject::account("a").unwrap();

        let all = source.fetch_history(&a, 10).await.unwrap();
        assert_eq!(all.iter().map(|s| s.block_number).collect::<Vec<_>>(), vec![1, 2, 3]);

        let newest = source.fetch_history(&a, 2).await.unwrap();
        assert_eq!(newest.iter().map(|s| s.block_number).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn injected_head_error_is_returned() {
        let source = NullSnapshotSource::new();
        source.set_head_error(Some(FetchError::NotFound("bitshares-2019-04".into())));
        assert!(matches!(
            source.head_block_time().await,
            Err(FetchError::NotFound(_))
        ));
        source.set_head_error(None);
        assert_eq!(source.head_block_time().await.unwrap(), None);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let source = NullSnapshotSource::new();
        let a = Subject::account("a").unwrap();
        source.fail_next(1);
        assert!(source.fetch_latest(&a, ts(0), ts(1)).await.is_err());
        assert!(source.fetch_latest(&a, ts(0), ts(1)).await.is_ok());
    }
}
