//! Leader slot filtering and block production metrics.

use crate::rpc::methods::LeaderSchedule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The slot indices a validator leads within one epoch.
///
/// Tagged with the epoch the schedule was fetched for, so the holder knows
/// to recompute when the epoch number moves on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderSlots {
    pub epoch: u64,
    /// Slot indices within the epoch, ascending
    pub slots: Vec<u64>,
}

/// Filter a raw schedule down to one identity's slots.
pub fn leader_slots(schedule: &LeaderSchedule, identity: &str, epoch: u64) -> LeaderSlots {
    let mut slots = schedule.get(identity).cloned().unwrap_or_default();
    slots.sort_unstable();
    LeaderSlots { epoch, slots }
}

/// Leadership metrics for the current epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderMetrics {
    pub slots_total: usize,
    pub slots_completed: usize,
    pub slots_upcoming: usize,
    pub next_slot: Option<u64>,
    pub blocks_produced: u64,
    pub slots_skipped: u64,
    /// Percent of completed leader slots that produced no block
    pub skip_rate: f64,
    pub seconds_until_next: Option<f64>,
}

/// Derive leadership metrics from the filtered slots, the epoch's current
/// slot index and the validator's `[assigned, produced]` production counts.
pub fn leader_metrics(
    slots: &LeaderSlots,
    slot_index: u64,
    production: Option<(u64, u64)>,
    slot_duration: Duration,
) -> LeaderMetrics {
    let completed: Vec<u64> =
        slots.slots.iter().copied().filter(|slot| *slot <= slot_index).collect();
    let upcoming: Vec<u64> =
        slots.slots.iter().copied().filter(|slot| *slot > slot_index).collect();

    let (blocks_produced, slots_skipped) = match production {
        Some((assigned, produced)) => (produced, assigned.saturating_sub(produced)),
        None => (0, 0),
    };

    let skip_rate = if completed.is_empty() {
        0.0
    } else {
        slots_skipped as f64 / completed.len() as f64 * 100.0
    };

    let next_slot = upcoming.first().copied();
    let seconds_until_next =
        next_slot.map(|slot| (slot - slot_index) as f64 * slot_duration.as_secs_f64());

    LeaderMetrics {
        slots_total: slots.slots.len(),
        slots_completed: completed.len(),
        slots_upcoming: upcoming.len(),
        next_slot,
        blocks_produced,
        slots_skipped,
        skip_rate,
        seconds_until_next,
    }
}
