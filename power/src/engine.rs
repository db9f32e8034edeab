//! The power engine: cache lookup, single-flight recomputation, build and reconcile.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use vpower_types::{Subject, Timestamp};

use crate::flight::KeyedLocks;
use crate::{
    reconcile, CacheKey, EngineMetrics, FetchPolicy, PowerError, ReconciledSeries, ResultCache,
    SeriesBuilder, SnapshotSource, StakeScale,
};

/// Engine tuning, usually taken from the service configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub stake_scale: StakeScale,
    /// `None` for an unbounded cache.
    pub cache_capacity: Option<usize>,
    pub fetch: FetchPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stake_scale: StakeScale::UNIT,
            cache_capacity: Some(1024),
            fetch: FetchPolicy::default(),
        }
    }
}

/// Computes and caches power series over a [`SnapshotSource`].
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct PowerEngine<S> {
    source: S,
    config: EngineConfig,
    cache: ResultCache,
    in_flight: KeyedLocks<Subject>,
    metrics: EngineMetrics,
}

impl<S: SnapshotSource> PowerEngine<S> {
    pub fn new(source: S, config: EngineConfig) -> Self {
        let cache = match config.cache_capacity {
            Some(capacity) => ResultCache::with_capacity(capacity),
            None => ResultCache::unbounded(),
        };
        Self {
            source,
            config,
            cache,
            in_flight: KeyedLocks::new(),
            metrics: EngineMetrics::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Self and proxied voting power of `subject` over `[from, to)` in
    /// `datapoints` windows.
    ///
    /// Served from cache when the subject's entry was computed for exactly
    /// these parameters. Otherwise recomputed, with at most one recomputation
    /// per subject in flight, and stored in place of the subject's entry.
    pub async fn get_power_series(
        &self,
        subject: &Subject,
        from: Timestamp,
        to: Timestamp,
        datapoints: usize,
    ) -> Result<Arc<ReconciledSeries>, PowerError> {
        let key = CacheKey {
            subject: subject.clone(),
            datapoints,
            from,
            to,
        };
        if let Some(hit) = self.cache.get(&key) {
            self.metrics.cache_hits.inc();
            debug!(%subject, datapoints, %from, %to, "power series cache hit");
            return Ok(hit);
        }

        let result = {
            let _guard = self.in_flight.lock(subject).await;
            // A concurrent request may have filled the entry while we waited.
            if let Some(hit) = self.cache.get(&key) {
                self.metrics.cache_hits.inc();
                debug!(%subject, "power series computed by concurrent request");
                Ok(hit)
            } else {
                self.metrics.cache_misses.inc();
                self.compute(key).await
            }
        };
        self.in_flight.cleanup().await;
        result
    }

    async fn compute(&self, key: CacheKey) -> Result<Arc<ReconciledSeries>, PowerError> {
        let started = Instant::now();
        let builder = SeriesBuilder::new(
            &self.source,
            self.config.stake_scale,
            &self.config.fetch,
            &self.metrics,
        );
        let series = builder
            .build(&key.subject, key.from, key.to, key.datapoints)
            .await?;
        let hits = series.successful_windows();
        let proxies = series.proxy_powers.len();
        let reconciled = Arc::new(reconcile(key.subject.clone(), series));

        let elapsed = started.elapsed();
        self.metrics
            .compute_time_ms
            .observe(elapsed.as_secs_f64() * 1000.0);
        info!(
            subject = %key.subject,
            windows = key.datapoints,
            hits,
            proxies,
            elapsed_ms = elapsed_ms(elapsed),
            "power series computed"
        );

        self.cache.put(key, Arc::clone(&reconciled));
        Ok(reconciled)
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
