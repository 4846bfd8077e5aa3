//! Snapshot types emitted by the tracking engine.

use crate::calc::{EpochProgress, LeaderMetrics};
use crate::tracker::ranking::RankedValidator;
use crate::types::Pubkey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The target validator's standing within one poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetStanding {
    pub rank: usize,
    pub identity: Pubkey,
    pub vote_pubkey: Pubkey,
    pub activated_stake: u64,
    pub credits: u64,
    pub last_vote: u64,
    pub root_slot: u64,
}

/// Credit statistics across the whole active set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStats {
    pub active_validators: usize,
    pub mean_credits: f64,
    pub median_credits: u64,
    /// Share of validators with strictly fewer credits than the target
    pub percentile: f64,
}

impl NetworkStats {
    /// Compute network statistics from the ranked set.
    pub fn from_ranked(ranked: &[RankedValidator], target_credits: u64) -> Self {
        if ranked.is_empty() {
            return Self {
                active_validators: 0,
                mean_credits: 0.0,
                median_credits: 0,
                percentile: 0.0,
            };
        }

        let mut credits: Vec<u64> = ranked.iter().map(|r| r.info.credits).collect();
        credits.sort_unstable();

        let total: u64 = credits.iter().sum();
        let below = credits.iter().filter(|c| **c < target_credits).count();

        Self {
            active_validators: credits.len(),
            mean_credits: total as f64 / credits.len() as f64,
            median_credits: credits[credits.len() / 2],
            percentile: below as f64 / credits.len() as f64 * 100.0,
        }
    }
}

/// Changes since the previous fresh snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickDeltas {
    pub credits: i64,
    pub missed_credits: i64,
    pub last_vote_slots: i64,
    pub root_slots: i64,
}

/// A credit comparison against one rank position, for display tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankComparison {
    pub rank: usize,
    /// How many more credits that rank holds than the target
    pub credit_diff: i64,
    pub is_target: bool,
}

/// One immutable result of the tracking loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// When the underlying poll completed
    pub taken_at: DateTime<Utc>,
    /// False when this is a re-emission of older data during degradation
    pub fresh: bool,
    pub epoch: u64,
    pub target: TargetStanding,
    pub rank1_credits: u64,
    /// Rank 1's credits minus the target's; 0 when the target is rank 1
    pub missed_credits: u64,
    pub deltas: Option<TickDeltas>,
    pub epoch_progress: EpochProgress,
    pub leader: Option<LeaderMetrics>,
    pub network: NetworkStats,
    /// Full ranked list for this poll
    pub validators: Vec<RankedValidator>,
}

impl TrackerSnapshot {
    /// Mark this snapshot as a stale re-emission.
    pub fn into_stale(mut self) -> Self {
        self.fresh = false;
        self
    }

    /// Build comparison rows for the given rank positions, inserting the
    /// target's own rank when it is not in the list. Rows come back sorted
    /// by rank.
    pub fn rank_comparisons(&self, ranks: &[usize]) -> Vec<RankComparison> {
        let mut rows: Vec<RankComparison> = ranks
            .iter()
            .filter_map(|rank| {
                self.validators.get(rank.checked_sub(1)?).map(|v| RankComparison {
                    rank: *rank,
                    credit_diff: v.info.credits as i64 - self.target.credits as i64,
                    is_target: *rank == self.target.rank,
                })
            })
            .collect();

        if rows.iter().all(|row| row.rank != self.target.rank) {
            rows.push(RankComparison { rank: self.target.rank, credit_diff: 0, is_target: true });
        }
        rows.sort_by_key(|row| row.rank);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::epoch_progress;
    use crate::rpc::methods::EpochInfo;
    use crate::tracker::ranking::{rank_validators, VoteAccountInfo};
    use std::time::Duration;

    fn ranked_set(credits: &[u64]) -> Vec<RankedValidator> {
        let accounts = credits
            .iter()
            .enumerate()
            .map(|(i, credits)| VoteAccountInfo {
                identity: format!("node-{i}"),
                vote_pubkey: format!("vote-{i}"),
                activated_stake: 1000,
                credits: *credits,
                last_vote: 0,
                root_slot: 0,
            })
            .collect();
        rank_validators(accounts)
    }

    fn snapshot_with(credits: &[u64], target_index: usize) -> TrackerSnapshot {
        let validators = ranked_set(credits);
        let target = validators
            .iter()
            .find(|v| v.info.identity == format!("node-{target_index}"))
            .unwrap();
        let info = EpochInfo {
            epoch: 701,
            absolute_slot: 100,
            slot_index: 100,
            slots_in_epoch: 432_000,
            block_height: None,
        };

        TrackerSnapshot {
            taken_at: Utc::now(),
            fresh: true,
            epoch: 701,
            target: TargetStanding {
                rank: target.rank,
                identity: target.info.identity.clone(),
                vote_pubkey: target.info.vote_pubkey.clone(),
                activated_stake: target.info.activated_stake,
                credits: target.info.credits,
                last_vote: 0,
                root_slot: 0,
            },
            rank1_credits: validators[0].info.credits,
            missed_credits: validators[0].info.credits - target.info.credits,
            deltas: None,
            epoch_progress: epoch_progress(&info, Duration::from_millis(400)),
            leader: None,
            network: NetworkStats::from_ranked(&validators, target.info.credits),
            validators,
        }
    }

    #[test]
    fn test_network_stats() {
        let ranked = ranked_set(&[500, 100, 300, 200, 400]);
        let stats = NetworkStats::from_ranked(&ranked, 300);

        assert_eq!(stats.active_validators, 5);
        assert_eq!(stats.mean_credits, 300.0);
        assert_eq!(stats.median_credits, 300);
        assert_eq!(stats.percentile, 40.0);
    }

    #[test]
    fn test_network_stats_empty_set() {
        let stats = NetworkStats::from_ranked(&[], 0);
        assert_eq!(stats.active_validators, 0);
        assert_eq!(stats.percentile, 0.0);
    }

    #[test]
    fn test_into_stale_flips_only_freshness() {
        let snapshot = snapshot_with(&[500, 300, 100], 1);
        let credits = snapshot.target.credits;
        let stale = snapshot.into_stale();

        assert!(!stale.fresh);
        assert_eq!(stale.target.credits, credits);
    }

    #[test]
    fn test_rank_comparisons_inserts_target_rank() {
        // node-1 has 300 credits -> rank 2 of 3.
        let snapshot = snapshot_with(&[500, 300, 100], 1);
        let rows = snapshot.rank_comparisons(&[1, 3]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], RankComparison { rank: 1, credit_diff: 200, is_target: false });
        assert_eq!(rows[1], RankComparison { rank: 2, credit_diff: 0, is_target: true });
        assert_eq!(rows[2], RankComparison { rank: 3, credit_diff: -200, is_target: false });
    }

    #[test]
    fn test_rank_comparisons_skips_out_of_range_ranks() {
        let snapshot = snapshot_with(&[500, 300, 100], 0);
        let rows = snapshot.rank_comparisons(&[1, 50]);

        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_target);
    }
}
