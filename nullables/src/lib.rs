//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies are abstracted behind traits; this crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap the search-index client for [`NullSnapshotSource`] in tests.

pub mod source;

pub use source::NullSnapshotSource;
