//! Epoch progress calculations.

use crate::rpc::methods::EpochInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Derived view of how far the current epoch has progressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochProgress {
    pub epoch: u64,
    pub current_slot: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    pub slots_remaining: u64,
    /// Percent complete, rounded to 4 decimal places
    pub percent_complete: f64,
    pub seconds_remaining: f64,
    pub estimated_end: DateTime<Utc>,
}

/// Derive epoch progress from raw epoch info.
///
/// `slot_duration` is the configured average slot duration; estimates are
/// linear extrapolations from it, not local measurements.
pub fn epoch_progress(info: &EpochInfo, slot_duration: Duration) -> EpochProgress {
    let slots_remaining = info.slots_in_epoch.saturating_sub(info.slot_index);
    let percent_complete = if info.slots_in_epoch == 0 {
        0.0
    } else {
        round4(info.slot_index as f64 / info.slots_in_epoch as f64 * 100.0)
    };
    let seconds_remaining = slots_remaining as f64 * slot_duration.as_secs_f64();
    let estimated_end =
        Utc::now() + chrono::Duration::milliseconds((seconds_remaining * 1000.0) as i64);

    EpochProgress {
        epoch: info.epoch,
        current_slot: info.absolute_slot,
        slot_index: info.slot_index,
        slots_in_epoch: info.slots_in_epoch,
        slots_remaining,
        percent_complete,
        seconds_remaining,
        estimated_end,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(slot_index: u64, slots_in_epoch: u64) -> EpochInfo {
        EpochInfo {
            epoch: 701,
            absolute_slot: 302_832_000 + slot_index,
            slot_index,
            slots_in_epoch,
            block_height: None,
        }
    }

    #[test]
    fn test_halfway_epoch_is_fifty_percent() {
        let progress = epoch_progress(&info(216_000, 432_000), Duration::from_millis(400));

        assert_eq!(progress.percent_complete, 50.0);
        assert_eq!(progress.slots_remaining, 216_000);
        assert_eq!(progress.seconds_remaining, 216_000.0 * 0.4);
    }

    #[test]
    fn test_percent_rounds_to_four_places() {
        let progress = epoch_progress(&info(1, 432_000), Duration::from_millis(400));
        assert_eq!(progress.percent_complete, 0.0002);
    }

    #[test]
    fn test_epoch_end_boundary() {
        let progress = epoch_progress(&info(432_000, 432_000), Duration::from_millis(400));

        assert_eq!(progress.percent_complete, 100.0);
        assert_eq!(progress.slots_remaining, 0);
        assert_eq!(progress.seconds_remaining, 0.0);
    }

    #[test]
    fn test_zero_length_epoch_does_not_divide() {
        let progress = epoch_progress(&info(0, 0), Duration::from_millis(400));
        assert_eq!(progress.percent_complete, 0.0);
    }

    #[test]
    fn test_estimated_end_is_in_the_future() {
        let before = Utc::now();
        let progress = epoch_progress(&info(0, 432_000), Duration::from_millis(400));
        assert!(progress.estimated_end > before);
    }
}
