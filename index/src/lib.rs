//! Search-index client for voting-statistics snapshots.
//!
//! The index holds one document per observed block per account. The client
//! answers "latest snapshot of a subject in a time window" with a single
//! size-1 sorted query, and reports the newest indexed block for health
//! checks.

pub mod client;
pub mod document;
pub mod error;
pub mod query;

pub use client::{IndexClient, IndexSettings};
pub use document::VotingDocument;
pub use error::IndexError;
