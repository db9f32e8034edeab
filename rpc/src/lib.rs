//! HTTP API for voting power over time.
//!
//! Provides endpoints for:
//! - Account self and proxied voting power over a time range
//! - Worker voting power over a time range
//! - The vote ids an account voted for over time
//! - Indexer liveness (`/is_alive`)
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod health;
pub mod params;
pub mod server;

pub use error::RpcError;
pub use handlers::{AppState, VoteRecord};
pub use health::{HealthError, HealthReport, HealthStatus};
pub use params::{PowerQuery, QueryLimits, VotesQuery};
pub use server::{router, RpcServer};
