//! Fundamental types for voting-power statistics.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! the subject a series is computed for, the voting-power snapshot observed at a
//! block, and the UTC timestamp used for windowing.

pub mod error;
pub mod snapshot;
pub mod subject;
pub mod time;

pub use error::TypeError;
pub use snapshot::{ProxyStake, Snapshot, PROXY_TO_SELF};
pub use subject::Subject;
pub use time::Timestamp;
