//! Live tracking of a validator's vote-credit standing.

pub mod engine;
pub mod ranking;
pub mod snapshot;

pub use engine::{TickError, TrackerState, TvcTracker};
pub use ranking::{rank_validators, RankedValidator, VoteAccountInfo};
pub use snapshot::{NetworkStats, RankComparison, TargetStanding, TickDeltas, TrackerSnapshot};
