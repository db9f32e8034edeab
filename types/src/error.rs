//! Errors raised while constructing fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid timestamp {0:?}: expected RFC 3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD")]
    InvalidTimestamp(String),

    #[error("timestamp out of range")]
    TimestampOutOfRange,

    #[error("empty subject identifier")]
    EmptySubject,
}
