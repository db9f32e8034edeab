//! Series building: one fetch per window, accumulated into aligned arrays.
//!
//! Successful windows are compacted: the `c`-th window that yields a snapshot
//! writes to index `c` of every array, whatever its calendar position. Block,
//! time and self-power arrays grow by appending; proxy arrays are allocated at
//! `datapoints` length on first sight and trimmed to the hit count by the
//! reconciler.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use vpower_types::{Snapshot, Subject, Timestamp};

use crate::{EngineMetrics, Intervals, PowerError, SnapshotSource};

/// Divisor applied to raw stake before it is stored (floor division).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeScale(u64);

impl StakeScale {
    pub const UNIT: Self = Self(1);

    /// `None` for a zero divisor.
    pub fn new(divisor: u64) -> Option<Self> {
        (divisor > 0).then_some(Self(divisor))
    }

    pub fn divisor(&self) -> u64 {
        self.0
    }

    pub fn apply(&self, raw: u64) -> u64 {
        raw / self.0
    }
}

impl Default for StakeScale {
    fn default() -> Self {
        Self::UNIT
    }
}

/// How window fetches are issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Window fetches in flight at once; 1 means strictly sequential.
    pub concurrency: usize,
    /// Extra attempts per window after a failed fetch.
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff: Duration,
}

impl FetchPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            concurrency: 1,
            retries: 0,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Per-proxy power buffers in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyPowers {
    entries: Vec<(String, Vec<u64>)>,
    index: HashMap<String, usize>,
}

impl ProxyPowers {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, proxy: &str) -> Option<&[u64]> {
        self.index.get(proxy).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.entries
            .iter()
            .map(|(proxy, powers)| (proxy.as_str(), powers.as_slice()))
    }

    /// Write `power` at `slot`, allocating a zeroed buffer of `capacity` slots
    /// the first time `proxy` is seen.
    fn set(&mut self, proxy: &str, slot: usize, power: u64, capacity: usize) {
        let i = match self.index.get(proxy) {
            Some(&i) => i,
            None => {
                self.entries.push((proxy.to_string(), vec![0; capacity]));
                self.index.insert(proxy.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        if let Some(cell) = self.entries[i].1.get_mut(slot) {
            *cell = power;
        }
    }

    /// Drop every slot at or beyond `len`.
    pub fn truncate(&mut self, len: usize) {
        for (_, powers) in &mut self.entries {
            powers.truncate(len);
        }
    }

    pub fn into_entries(self) -> Vec<(String, Vec<u64>)> {
        self.entries
    }
}

/// Aggregated, untrimmed series for one subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    pub datapoints: usize,
    pub blocks: Vec<u64>,
    pub block_times: Vec<Timestamp>,
    pub self_powers: Vec<u64>,
    pub proxy_powers: ProxyPowers,
}

impl Series {
    pub fn empty(datapoints: usize) -> Self {
        Self {
            datapoints,
            blocks: Vec::new(),
            block_times: Vec::new(),
            self_powers: Vec::new(),
            proxy_powers: ProxyPowers::default(),
        }
    }

    /// Accumulate per-window fetch results, in window order.
    pub fn from_windows(
        datapoints: usize,
        scale: StakeScale,
        windows: impl IntoIterator<Item = Option<Snapshot>>,
    ) -> Self {
        let mut series = Self::empty(datapoints);
        for snapshot in windows.into_iter().flatten() {
            series.record(&snapshot, scale);
        }
        series
    }

    /// Count of windows that yielded a snapshot.
    pub fn successful_windows(&self) -> usize {
        self.self_powers.len()
    }

    fn record(&mut self, snapshot: &Snapshot, scale: StakeScale) {
        let slot = self.successful_windows();
        self.blocks.push(snapshot.block_number);
        self.block_times.push(snapshot.block_time);
        self.self_powers.push(scale.apply(snapshot.self_stake()));
        for proxied in &snapshot.proxy_for {
            self.proxy_powers
                .set(&proxied.account, slot, scale.apply(proxied.stake), self.datapoints);
        }
    }
}

/// Drives interval generation and window fetches for one request.
pub struct SeriesBuilder<'a, S> {
    source: &'a S,
    scale: StakeScale,
    policy: &'a FetchPolicy,
    metrics: &'a EngineMetrics,
}

impl<'a, S: SnapshotSource> SeriesBuilder<'a, S> {
    pub fn new(
        source: &'a S,
        scale: StakeScale,
        policy: &'a FetchPolicy,
        metrics: &'a EngineMetrics,
    ) -> Self {
        Self {
            source,
            scale,
            policy,
            metrics,
        }
    }

    pub async fn build(
        &self,
        subject: &Subject,
        from: Timestamp,
        to: Timestamp,
        datapoints: usize,
    ) -> Result<Series, PowerError> {
        let intervals = Intervals::generate(from, to, datapoints)?;
        debug!(
            %subject,
            windows = intervals.len(),
            width = %vpower_utils::format_window(intervals.width_nanos()),
            "fetching windows"
        );
        let windows = self.fetch_windows(subject, &intervals).await?;
        Ok(Series::from_windows(datapoints, self.scale, windows))
    }

    /// Fetch every window, keeping results in window order regardless of
    /// how many fetches run at once. The first unrecoverable failure aborts.
    async fn fetch_windows(
        &self,
        subject: &Subject,
        intervals: &Intervals,
    ) -> Result<Vec<Option<Snapshot>>, PowerError> {
        let fetches: Vec<_> = intervals
            .windows()
            .map(|(start, end)| self.fetch_window(subject, start, end))
            .collect();
        stream::iter(fetches)
            .buffered(self.policy.concurrency.max(1))
            .try_collect()
            .await
    }

    async fn fetch_window(
        &self,
        subject: &Subject,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Option<Snapshot>, PowerError> {
        let mut attempt = 0;
        loop {
            self.metrics.window_fetches.inc();
            match self.source.fetch_latest(subject, start, end).await {
                Ok(found) => return Ok(found),
                Err(err) if attempt < self.policy.retries => {
                    let delay = self.policy.backoff_for(attempt);
                    self.metrics.fetch_retries.inc();
                    warn!(%subject, %start, %end, attempt, ?delay, error = %err, "snapshot fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    self.metrics.fetch_errors.inc();
                    return Err(PowerError::Fetch { start, end, source });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpower_types::{ProxyStake, PROXY_TO_SELF};

    fn snapshot(block: u64, stake: u64, proxy: &str, proxy_for: &[(&str, u64)]) -> Snapshot {
        Snapshot {
            account_id: "1.2.285".into(),
            stake,
            proxy_id: proxy.into(),
            proxy_for: proxy_for
                .iter()
                .map(|(account, stake)| ProxyStake::new(*account, *stake))
                .collect(),
            votes: Vec::new(),
            block_number: block,
            block_time: Timestamp::from_unix_secs(block as i64 * 3).unwrap(),
        }
    }

    #[test]
    fn self_power_only_counts_without_proxy() {
        let series = Series::from_windows(
            2,
            StakeScale::UNIT,
            vec![
                Some(snapshot(1, 70, PROXY_TO_SELF, &[])),
                Some(snapshot(2, 80, "1.2.99", &[])),
            ],
        );
        assert_eq!(series.self_powers, vec![70, 0]);
        assert_eq!(series.blocks, vec![1, 2]);
    }

    #[test]
    fn empty_windows_are_skipped_and_proxies_compacted() {
        let series = Series::from_windows(
            4,
            StakeScale::UNIT,
            vec![
                None,
                Some(snapshot(10, 0, "1.2.99", &[("1.2.7", 40)])),
                None,
                Some(snapshot(30, 0, "1.2.99", &[("1.2.7", 45), ("1.2.8", 5)])),
            ],
        );
        assert_eq!(series.blocks, vec![10, 30]);
        assert_eq!(series.successful_windows(), 2);
        // Written at the hit counter, not the window index; tail stays zeroed.
        assert_eq!(series.proxy_powers.get("1.2.7"), Some(&[40, 45, 0, 0][..]));
        assert_eq!(series.proxy_powers.get("1.2.8"), Some(&[0, 5, 0, 0][..]));
    }

    #[test]
    fn proxies_keep_first_seen_order() {
        let series = Series::from_windows(
            2,
            StakeScale::UNIT,
            vec![
                Some(snapshot(1, 0, "x", &[("b", 1), ("a", 2)])),
                Some(snapshot(2, 0, "x", &[("c", 3), ("a", 4)])),
            ],
        );
        let order: Vec<_> = series.proxy_powers.iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn no_hits_yields_empty_arrays() {
        let series = Series::from_windows(3, StakeScale::UNIT, vec![None, None, None]);
        assert!(series.blocks.is_empty());
        assert!(series.block_times.is_empty());
        assert!(series.self_powers.is_empty());
        assert!(series.proxy_powers.is_empty());
    }

    #[test]
    fn stake_scale_floors() {
        let scale = StakeScale::new(100_000).unwrap();
        let series = Series::from_windows(
            1,
            scale,
            vec![Some(snapshot(1, 1_299_999, PROXY_TO_SELF, &[("p", 99_999)]))],
        );
        assert_eq!(series.self_powers, vec![12]);
        assert_eq!(series.proxy_powers.get("p"), Some(&[0][..]));
        assert!(StakeScale::new(0).is_none());
    }

    #[test]
    fn backoff_doubles() {
        let policy = FetchPolicy {
            backoff: Duration::from_millis(100),
            ..FetchPolicy::default()
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(800));
    }
}
