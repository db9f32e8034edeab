//! Axum-based HTTP server.

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

use vpower_power::SnapshotSource;

use crate::handlers::{self, AppState};
use crate::RpcError;

/// Build the router for every endpoint.
pub fn router<S: SnapshotSource + 'static>(state: AppState<S>, enable_cors: bool) -> Router {
    let app = Router::new()
        .route(
            "/get_account_power_over_time",
            get(handlers::account_power::<S>),
        )
        .route(
            "/get_worker_power_over_time",
            get(handlers::worker_power::<S>),
        )
        .route(
            "/get_voted_workers_over_time",
            get(handlers::voted_workers::<S>),
        )
        .route("/is_alive", get(handlers::is_alive::<S>))
        .route("/metrics", get(handlers::metrics::<S>))
        .with_state(state);
    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

pub struct RpcServer {
    pub addr: SocketAddr,
    pub enable_cors: bool,
}

impl RpcServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            enable_cors: true,
        }
    }

    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Bind and serve until the process exits.
    pub async fn serve<S: SnapshotSource + 'static>(
        &self,
        state: AppState<S>,
    ) -> Result<(), RpcError> {
        let app = router(state, self.enable_cors);
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, cors = self.enable_cors, "HTTP API listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
