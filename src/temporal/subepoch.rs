//! C4: Sub-Epoch Distributor.
//!
//! Maps the timestamped event stream from [`super::events`] into one of
//! `horizon_hours * SUB_EPOCHS_PER_HOUR` sub-epoch buckets, then injects
//! bursts: short runs of extra copies of the same send clustered a couple of
//! buckets away from the original.

use crate::graph::NodeId;
use crate::rng::DeterministicRng;
use crate::temporal::events::{SendEvent, HOUR_MS};

pub const SUB_EPOCHS_PER_HOUR: u32 = 6;

#[derive(Debug, Clone, Copy)]
pub struct SubEpochSettings {
    pub burst_probability: f64,
    pub burst_window: i64,
    pub burst_size_min: i64,
    pub burst_size_max: i64,
}

impl Default for SubEpochSettings {
    fn default() -> Self {
        Self {
            burst_probability: 0.2,
            burst_window: 2,
            burst_size_min: 2,
            burst_size_max: 5,
        }
    }
}

/// For sub-epoch `se`, `se / SUB_EPOCHS_PER_HOUR` is the containing epoch.
pub fn total_sub_epochs(horizon_hours: u32) -> usize {
    horizon_hours as usize * SUB_EPOCHS_PER_HOUR as usize
}

pub fn epoch_of(sub_epoch: usize) -> usize {
    sub_epoch / SUB_EPOCHS_PER_HOUR as usize
}

/// Returns, per sub-epoch bucket, the list of users with a scheduled send.
pub fn distribute(
    events: &[SendEvent],
    horizon_hours: u32,
    settings: &SubEpochSettings,
    rng: &mut DeterministicRng,
) -> Vec<Vec<NodeId>> {
    let total = total_sub_epochs(horizon_hours);
    let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); total];

    for event in events {
        let hour = (event.t_ms / HOUR_MS) as i64;
        let frac_in_hour = (event.t_ms % HOUR_MS) as f64 / HOUR_MS as f64;
        let subhour = (frac_in_hour * SUB_EPOCHS_PER_HOUR as f64).floor() as i64;
        let jitter = ((rng.next_f64() - 0.5) * 2.0).floor() as i64;
        let bucket = clamp_bucket(hour * SUB_EPOCHS_PER_HOUR as i64 + subhour + jitter, total);
        buckets[bucket].push(event.user);

        if rng.next_bool(settings.burst_probability) {
            let burst_size =
                rng.next_range_inclusive(settings.burst_size_min, settings.burst_size_max);
            for _ in 0..(burst_size - 1) {
                let delta = rng.next_range_inclusive(-settings.burst_window, settings.burst_window);
                let nearby = clamp_bucket(bucket as i64 + delta, total);
                buckets[nearby].push(event.user);
            }
        }
    }
    buckets
}

fn clamp_bucket(bucket: i64, total: usize) -> usize {
    bucket.clamp(0, total as i64 - 1) as usize
}
