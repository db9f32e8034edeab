//! HTTP client for the voting-statistics search index.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

use vpower_power::{FetchError, SnapshotSource};
use vpower_types::{Snapshot, Subject, Timestamp};

use crate::document::{self, AggregationResponse, SearchResponse, VotingDocument};
use crate::query::{self, HEAD_AGGREGATION};
use crate::IndexError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to reach the search index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSettings {
    /// Base URL, e.g. `http://localhost:9200`.
    pub url: String,
    /// Index holding voting-statistics documents.
    pub voting_index: String,
    /// Prefix of the monthly operation indices used for the head-block probe.
    pub operations_index_prefix: String,
    pub timeout: Duration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".into(),
            voting_index: "objects-voting-statistics".into(),
            operations_index_prefix: "bitshares-".into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the search index.
///
/// Sends `POST {url}/{index}/_search` with a JSON query body. Implements
/// [`SnapshotSource`] so the power engine can read from it directly.
pub struct IndexClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    settings: IndexSettings,
}

impl IndexClient {
    pub fn new(settings: IndexSettings) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            settings,
        }
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.settings.url.trim_end_matches('/'), index)
    }

    /// Run one search against `index` and decode the response body.
    async fn search<T: DeserializeOwned>(&self, index: &str, body: &Value) -> Result<T, IndexError> {
        let response = self
            .http_client
            .post(self.search_url(index))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Status {
                index: index.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| {
            IndexError::InvalidResponse(format!("failed to parse search response: {e}"))
        })
    }

    /// Newest snapshot of `subject` in `[start, end)`.
    pub async fn latest_snapshot(
        &self,
        subject: &Subject,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Option<Snapshot>, IndexError> {
        let body = query::window_query(subject, start, end);
        let response: SearchResponse<VotingDocument> =
            self.search(&self.settings.voting_index, &body).await?;
        let found = document::first_snapshot(response)?;
        trace!(
            %subject,
            %start,
            %end,
            block = found.as_ref().map(|s| s.block_number),
            "window query"
        );
        Ok(found)
    }

    /// The newest `limit` snapshots of `subject`, oldest first.
    pub async fn snapshot_history(
        &self,
        subject: &Subject,
        limit: usize,
    ) -> Result<Vec<Snapshot>, IndexError> {
        let body = query::history_query(subject, limit);
        let response: SearchResponse<VotingDocument> =
            self.search(&self.settings.voting_index, &body).await?;
        let mut history = document::all_snapshots(response)?;
        history.reverse();
        trace!(%subject, limit, found = history.len(), "history query");
        Ok(history)
    }

    /// Block time of the newest operation indexed during the last day, from
    /// this month's operations index.
    pub async fn newest_block_time(&self, now: Timestamp) -> Result<Option<Timestamp>, IndexError> {
        let index = query::operations_index(&self.settings.operations_index_prefix, now);
        let response: AggregationResponse =
            self.search(&index, &query::head_block_query(now)).await?;
        Ok(response
            .aggregations
            .get(HEAD_AGGREGATION)
            .and_then(|agg| agg.value)
            .and_then(|millis| Timestamp::from_unix_millis(millis as i64)))
    }
}

impl Default for IndexClient {
    fn default() -> Self {
        Self::new(IndexSettings::default())
    }
}

impl SnapshotSource for IndexClient {
    async fn fetch_latest(
        &self,
        subject: &Subject,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Option<Snapshot>, FetchError> {
        Ok(self
            .latest_snapshot(subject, window_start, window_end)
            .await?)
    }

    async fn fetch_history(
        &self,
        subject: &Subject,
        limit: usize,
    ) -> Result<Vec<Snapshot>, FetchError> {
        Ok(self.snapshot_history(subject, limit).await?)
    }

    async fn head_block_time(&self) -> Result<Option<Timestamp>, FetchError> {
        Ok(self.newest_block_time(Timestamp::now()).await?)
    }
}
