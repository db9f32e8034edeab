//! Search-index response documents and their conversion into snapshots.

use serde::Deserialize;
use std::collections::HashMap;

use vpower_types::{ProxyStake, Snapshot, Timestamp};

use crate::IndexError;

/// Stake as stored by the indexer: a JSON number or a decimal string.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StakeValue {
    Int(u64),
    Text(String),
}

impl StakeValue {
    fn to_u64(&self) -> Result<u64, IndexError> {
        match self {
            StakeValue::Int(v) => Ok(*v),
            StakeValue::Text(s) => s.trim().parse().map_err(|_| {
                IndexError::InvalidResponse(format!("stake is not an unsigned integer: {s:?}"))
            }),
        }
    }
}

/// One `objects-voting-statistics` document.
#[derive(Clone, Debug, Deserialize)]
pub struct VotingDocument {
    pub account: String,
    pub stake: StakeValue,
    pub proxy: String,
    /// `[[account, stake], ...]`
    #[serde(default)]
    pub proxy_for: Vec<(String, StakeValue)>,
    #[serde(default)]
    pub votes: Vec<String>,
    pub block_number: u64,
    pub block_time: String,
}

impl VotingDocument {
    pub fn into_snapshot(self) -> Result<Snapshot, IndexError> {
        let block_time = Timestamp::parse(&self.block_time).map_err(|e| {
            IndexError::InvalidResponse(format!("block {}: {e}", self.block_number))
        })?;
        let proxy_for = self
            .proxy_for
            .iter()
            .map(|(account, stake)| Ok(ProxyStake::new(account.clone(), stake.to_u64()?)))
            .collect::<Result<Vec<_>, IndexError>>()?;
        Ok(Snapshot {
            account_id: self.account,
            stake: self.stake.to_u64()?,
            proxy_id: self.proxy,
            proxy_for,
            votes: self.votes,
            block_number: self.block_number,
            block_time,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse<T> {
    pub hits: Hits<T>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Hits<T> {
    #[serde(default)]
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hit<T> {
    #[serde(rename = "_source")]
    pub source: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AggregationResponse {
    #[serde(default)]
    pub aggregations: HashMap<String, MetricAggregation>,
}

/// A single-value metric aggregation such as `max`.
#[derive(Debug, Deserialize)]
pub(crate) struct MetricAggregation {
    /// Epoch milliseconds for date fields; `null` when no document matched.
    pub value: Option<f64>,
}

/// The first hit of a size-1 search, converted to a snapshot.
pub(crate) fn first_snapshot(
    response: SearchResponse<VotingDocument>,
) -> Result<Option<Snapshot>, IndexError> {
    response
        .hits
        .hits
        .into_iter()
        .next()
        .map(|hit| hit.source.into_snapshot())
        .transpose()
}

/// Every hit of a search, converted to snapshots in hit order.
pub(crate) fn all_snapshots(
    response: SearchResponse<VotingDocument>,
) -> Result<Vec<Snapshot>, IndexError> {
    response
        .hits
        .hits
        .into_iter()
        .map(|hit| hit.source.into_snapshot())
        .collect()
}
