//! Windowed voting-power aggregation.
//!
//! Given a subject (an account or a worker vote id) and a `[from, to)` range,
//! the engine splits the range into equal windows, takes the latest snapshot in
//! each window from a [`SnapshotSource`], accumulates self-stake and per-proxy
//! stake into aligned series, merges proxies holding less than 5% of the final
//! total into one bucket, and caches the result per subject.
//!
//! Pipeline: [`interval`] → [`series`] → [`reconcile`] → [`cache`], driven by
//! [`PowerEngine`].

pub mod cache;
pub mod engine;
pub mod error;
pub mod flight;
pub mod interval;
pub mod metrics;
pub mod reconcile;
pub mod series;
pub mod source;

pub use cache::{CacheKey, ResultCache};
pub use engine::{EngineConfig, PowerEngine};
pub use error::{FetchError, PowerError};
pub use interval::Intervals;
pub use metrics::EngineMetrics;
pub use reconcile::{reconcile, ReconciledSeries, MERGED_LABEL};
pub use series::{FetchPolicy, ProxyPowers, Series, SeriesBuilder, StakeScale};
pub use source::SnapshotSource;
