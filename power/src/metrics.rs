//! Prometheus metrics for the power engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`] that the HTTP `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

pub struct EngineMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Requests answered from the result cache.
    pub cache_hits: IntCounter,
    /// Requests that recomputed their series.
    pub cache_misses: IntCounter,
    /// Window fetch attempts issued to the snapshot source.
    pub window_fetches: IntCounter,
    /// Window fetches that failed after all retries.
    pub fetch_errors: IntCounter,
    /// Window fetches retried after a failure.
    pub fetch_retries: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time to build and reconcile one series, in milliseconds.
    pub compute_time_ms: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let cache_hits = register_int_counter_with_registry!(
            Opts::new("vpower_cache_hits_total", "Series requests served from cache"),
            registry
        )
        .expect("failed to register cache_hits counter");

        let cache_misses = register_int_counter_with_registry!(
            Opts::new("vpower_cache_misses_total", "Series requests that recomputed"),
            registry
        )
        .expect("failed to register cache_misses counter");

        let window_fetches = register_int_counter_with_registry!(
            Opts::new(
                "vpower_window_fetches_total",
                "Snapshot fetch attempts, one or more per window"
            ),
            registry
        )
        .expect("failed to register window_fetches counter");

        let fetch_errors = register_int_counter_with_registry!(
            Opts::new(
                "vpower_fetch_errors_total",
                "Window fetches that failed after all retries"
            ),
            registry
        )
        .expect("failed to register fetch_errors counter");

        let fetch_retries = register_int_counter_with_registry!(
            Opts::new("vpower_fetch_retries_total", "Window fetches retried"),
            registry
        )
        .expect("failed to register fetch_retries counter");

        // 1 ms → ~16 s.
        let compute_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "vpower_compute_time_ms",
                "Series computation time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap_or_default()),
            registry
        )
        .expect("failed to register compute_time_ms histogram");

        Self {
            registry,
            cache_hits,
            cache_misses,
            window_fetches,
            fetch_errors,
            fetch_retries,
            compute_time_ms,
        }
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = EngineMetrics::new();
        metrics.cache_hits.inc();
        let text = metrics.encode_text().unwrap();
        assert!(text.contains("vpower_cache_hits_total 1"));
        assert!(text.contains("vpower_compute_time_ms_bucket"));
    }
}
