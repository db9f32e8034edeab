//! Voting-power snapshot: one account's voting state observed at a block.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Proxy id meaning "no delegation": the account votes with its own stake.
pub const PROXY_TO_SELF: &str = "1.2.5";

/// Stake an account delegated to the snapshot's account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyStake {
    pub account: String,
    /// Raw stake units.
    pub stake: u64,
}

impl ProxyStake {
    pub fn new(account: impl Into<String>, stake: u64) -> Self {
        Self {
            account: account.into(),
            stake,
        }
    }
}

/// One observation of an account's voting state at a block.
///
/// Immutable once fetched; `proxy_for` entries are unique by account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub account_id: String,
    /// Raw stake units held by the account itself.
    pub stake: u64,
    /// Account this one delegates to, or [`PROXY_TO_SELF`].
    pub proxy_id: String,
    /// Accounts that delegate to this one, in index order.
    pub proxy_for: Vec<ProxyStake>,
    /// Vote ids (workers, committee members, witnesses) the account votes for.
    #[serde(default)]
    pub votes: Vec<String>,
    pub block_number: u64,
    pub block_time: Timestamp,
}

impl Snapshot {
    /// Whether the account votes with its own stake (no outgoing proxy).
    pub fn votes_for_self(&self) -> bool {
        self.proxy_id == PROXY_TO_SELF
    }

    /// Stake this snapshot contributes as self-power: the account's own stake
    /// when it has no proxy, otherwise nothing.
    pub fn self_stake(&self) -> u64 {
        if self.votes_for_self() {
            self.stake
        } else {
            0
        }
    }
}
