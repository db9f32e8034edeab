//! HTTP request handlers.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use vpower_power::{PowerEngine, SnapshotSource};
use vpower_types::{Snapshot, Subject, Timestamp};

use crate::health::HealthReport;
use crate::params::{PowerQuery, QueryLimits, VotesQuery};
use crate::RpcError;

/// Account queried when `account` is absent.
pub const DEFAULT_ACCOUNT: &str = "1.2.17";

/// Worker vote id queried when `vote_id` is absent.
pub const DEFAULT_VOTE_ID: &str = "1:0";

/// Shared state handed to every handler.
pub struct AppState<S> {
    pub engine: Arc<PowerEngine<S>>,
    pub limits: QueryLimits,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            limits: self.limits,
        }
    }
}

impl<S> AppState<S> {
    pub fn new(engine: Arc<PowerEngine<S>>, limits: QueryLimits) -> Self {
        Self { engine, limits }
    }
}

// ── Power ────────────────────────────────────────────────────────────────

pub async fn account_power<S: SnapshotSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<PowerQuery>,
) -> Result<Response, RpcError> {
    let id = query.account.as_deref().unwrap_or(DEFAULT_ACCOUNT);
    let subject = Subject::account(id).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    power_series(&state, subject, &query).await
}

pub async fn worker_power<S: SnapshotSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<PowerQuery>,
) -> Result<Response, RpcError> {
    let id = query.vote_id.as_deref().unwrap_or(DEFAULT_VOTE_ID);
    let subject = Subject::worker(id).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    power_series(&state, subject, &query).await
}

async fn power_series<S: SnapshotSource>(
    state: &AppState<S>,
    subject: Subject,
    query: &PowerQuery,
) -> Result<Response, RpcError> {
    let range = state.limits.resolve(query, Timestamp::now())?;
    debug!(
        %subject,
        from = %range.from,
        to = %range.to,
        datapoints = range.datapoints,
        "power series request"
    );
    let series = state
        .engine
        .get_power_series(&subject, range.from, range.to, range.datapoints)
        .await?;
    Ok(Json(&*series).into_response())
}

// ── Votes ────────────────────────────────────────────────────────────────

/// What an account voted for at one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteRecord {
    pub block_number: u64,
    pub block_time: Timestamp,
    pub votes: Vec<String>,
}

impl From<Snapshot> for VoteRecord {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            block_number: snapshot.block_number,
            block_time: snapshot.block_time,
            votes: snapshot.votes,
        }
    }
}

pub async fn voted_workers<S: SnapshotSource + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<VotesQuery>,
) -> Result<Json<Vec<VoteRecord>>, RpcError> {
    let id = query.account.as_deref().unwrap_or(DEFAULT_ACCOUNT);
    let subject = Subject::account(id).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let size = state.limits.effective_history_size(query.size.as_deref())?;
    debug!(%subject, size, "vote history request");
    let history = state.engine.source().fetch_history(&subject, size).await?;
    Ok(Json(history.into_iter().map(VoteRecord::from).collect()))
}

// ── Health ───────────────────────────────────────────────────────────────

pub async fn is_alive<S: SnapshotSource + 'static>(
    State(state): State<AppState<S>>,
) -> Json<HealthReport> {
    let head = state.engine.source().head_block_time().await;
    Json(HealthReport::evaluate(Timestamp::now(), head))
}

// ── Metrics ──────────────────────────────────────────────────────────────

pub async fn metrics<S: SnapshotSource + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Response, RpcError> {
    let body = state
        .engine
        .metrics()
        .encode_text()
        .map_err(|e| RpcError::Server(format!("failed to encode metrics: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
