//! The subject a power series is computed for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Snapshot, TypeError};

/// An account (`1.2.285`) or a worker vote id (`1:0`).
///
/// Account subjects match snapshots by their `account` field; worker subjects
/// match every snapshot whose vote list contains the vote id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    Account(String),
    Worker(String),
}

impl Subject {
    pub fn account(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::EmptySubject);
        }
        Ok(Self::Account(id))
    }

    pub fn worker(vote_id: impl Into<String>) -> Result<Self, TypeError> {
        let vote_id = vote_id.into();
        if vote_id.trim().is_empty() {
            return Err(TypeError::EmptySubject);
        }
        Ok(Self::Worker(vote_id))
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Account(id) | Self::Worker(id) => id,
        }
    }

    /// Name of the response field carrying the subject identifier.
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Account(_) => "account",
            Self::Worker(_) => "vote_id",
        }
    }

    /// Name of the response field carrying the reconciled per-proxy series.
    pub fn powers_field(&self) -> &'static str {
        match self {
            Self::Account(_) => "proxy_powers",
            Self::Worker(_) => "total_powers",
        }
    }

    /// Whether `snapshot` is an observation of this subject.
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        match self {
            Self::Account(id) => snapshot.account_id == *id,
            Self::Worker(vote_id) => snapshot.votes.iter().any(|v| v == vote_id),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.id_field(), self.id())
    }
}
