//! Proxy reconciliation: trim, merge small proxies, sort.

use serde::ser::{Serialize, SerializeMap, Serializer};

use vpower_types::{Subject, Timestamp};

use crate::Series;

/// Label of the synthetic series holding every merged proxy.
pub const MERGED_LABEL: &str = "< 5%";

/// Proxies whose final-window power is below this share of the final total
/// are merged into [`MERGED_LABEL`].
pub const MERGE_FRACTION: f64 = 0.05;

/// Presentation-ready series for one subject.
///
/// Every array has one entry per successful window, index-aligned with
/// `blocks`. `powers` is sorted ascending by final-window power.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconciledSeries {
    pub subject: Subject,
    pub blocks: Vec<u64>,
    pub block_times: Vec<Timestamp>,
    pub self_powers: Vec<u64>,
    pub powers: Vec<(String, Vec<u64>)>,
}

impl ReconciledSeries {
    pub fn empty(subject: Subject) -> Self {
        Self {
            subject,
            blocks: Vec::new(),
            block_times: Vec::new(),
            self_powers: Vec::new(),
            powers: Vec::new(),
        }
    }

    /// Self power plus every proxy series at the final window (0 when empty).
    pub fn total_last(&self) -> u128 {
        let Some(last) = self.self_powers.len().checked_sub(1) else {
            return 0;
        };
        self.self_powers[last] as u128
            + self
                .powers
                .iter()
                .map(|(_, powers)| powers[last] as u128)
                .sum::<u128>()
    }
}

/// Serialized as `{account|vote_id, blocks, block_time, self_powers,
/// proxy_powers|total_powers}` with the power list as `[[label, [..]], ..]`.
impl Serialize for ReconciledSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(self.subject.id_field(), self.subject.id())?;
        map.serialize_entry("blocks", &self.blocks)?;
        map.serialize_entry("block_time", &self.block_times)?;
        map.serialize_entry("self_powers", &self.self_powers)?;
        map.serialize_entry(self.subject.powers_field(), &self.powers)?;
        map.end()
    }
}

/// Trim proxy buffers to the hit count, merge proxies below 5% of the final
/// total into one bucket, and sort ascending by final-window power.
///
/// The merged bucket is always present when there is at least one hit. Ties
/// keep first-seen order, with the merged bucket after every kept proxy.
pub fn reconcile(subject: Subject, mut series: Series) -> ReconciledSeries {
    let n = series.successful_windows();
    series.proxy_powers.truncate(n);
    if n == 0 {
        return ReconciledSeries::empty(subject);
    }
    let last = n - 1;

    let proxies = series.proxy_powers.into_entries();
    let total_last = series.self_powers[last] as u128
        + proxies
            .iter()
            .map(|(_, powers)| powers[last] as u128)
            .sum::<u128>();
    let merge_below = MERGE_FRACTION * total_last as f64;

    let mut merged = vec![0u64; n];
    let mut kept = Vec::with_capacity(proxies.len() + 1);
    for (proxy, powers) in proxies {
        if (powers[last] as f64) < merge_below {
            for (acc, power) in merged.iter_mut().zip(&powers) {
                *acc = acc.saturating_add(*power);
            }
        } else {
            kept.push((proxy, powers));
        }
    }
    kept.push((MERGED_LABEL.to_string(), merged));
    kept.sort_by_key(|(_, powers)| powers[last]);

    ReconciledSeries {
        subject,
        blocks: series.blocks,
        block_times: series.block_times,
        self_powers: series.self_powers,
        powers: kept,
    }
}
