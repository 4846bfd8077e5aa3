//! Vote-credit extraction and deterministic ranking.

use crate::rpc::methods::VoteAccount;
use crate::types::Pubkey;
use serde::{Deserialize, Serialize};

/// Immutable per-poll view of one validator's vote performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteAccountInfo {
    /// Node identity pubkey
    pub identity: Pubkey,
    pub vote_pubkey: Pubkey,
    pub activated_stake: u64,
    /// Credits earned in the current epoch
    pub credits: u64,
    pub last_vote: u64,
    pub root_slot: u64,
}

impl VoteAccountInfo {
    /// Extract current-epoch credits from a wire vote account.
    ///
    /// The newest `epochCredits` entry is `[epoch, credits, prev]`; the
    /// per-epoch earn is the difference. Accounts whose newest entry is
    /// older than the previous epoch are stale and excluded from ranking.
    pub fn from_wire(account: &VoteAccount, current_epoch: u64) -> Option<Self> {
        let [epoch, credits, prev] = *account.epoch_credits.last()?;
        if epoch + 1 < current_epoch {
            return None;
        }

        Some(Self {
            identity: account.node_pubkey.clone(),
            vote_pubkey: account.vote_pubkey.clone(),
            activated_stake: account.activated_stake,
            credits: credits.saturating_sub(prev),
            last_vote: account.last_vote,
            root_slot: account.root_slot.unwrap_or(0),
        })
    }
}

/// A validator with its 1-indexed rank for the current poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedValidator {
    pub rank: usize,
    #[serde(flatten)]
    pub info: VoteAccountInfo,
}

/// Rank validators into a total order: credits descending, ties broken by
/// activated stake descending, then identity pubkey ascending. The order
/// is deterministic for any input permutation.
pub fn rank_validators(mut accounts: Vec<VoteAccountInfo>) -> Vec<RankedValidator> {
    accounts.sort_by(|a, b| {
        b.credits
            .cmp(&a.credits)
            .then_with(|| b.activated_stake.cmp(&a.activated_stake))
            .then_with(|| a.identity.cmp(&b.identity))
    });

    accounts
        .into_iter()
        .enumerate()
        .map(|(index, info)| RankedValidator { rank: index + 1, info })
        .collect()
}
