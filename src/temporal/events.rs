//! C3: event timestamp generation under a diurnal activity curve.
//!
//! `generateEventsForHours` in spec.md 4.3 is a 24-hour diurnal shaping
//! function; for a horizon of `T` hours we apply it with `hour % 24` so the
//! curve repeats every simulated day.

use crate::graph::NodeId;
use crate::rng::DeterministicRng;

pub const HOURS_PER_DAY: u32 = 24;
pub const HOUR_MS: u64 = 3_600_000;

/// A campus-life curve: low overnight (~0.1), ramping through the morning,
/// peaking at 1.4 in the early afternoon, tapering into the evening.
pub const DIURNAL_MULTIPLIERS: [f64; 24] = [
    0.10, 0.10, 0.10, 0.10, 0.10, 0.15, // 00-05 overnight
    0.30, 0.55, 0.85, 1.05, 1.20, 1.30, // 06-11 morning ramp
    1.35, 1.40, 1.35, 1.25, 1.15, 1.05, // 12-17 midday peak, early afternoon = 1.4
    0.95, 0.85, 0.70, 0.50, 0.30, 0.18, // 18-23 evening taper
];

#[derive(Debug, Clone, Copy)]
pub struct SendEvent {
    pub user: NodeId,
    /// Absolute timestamp in milliseconds from simulation start.
    pub t_ms: u64,
}

/// Generates the timestamped stream of send events for `horizon_hours`
/// hours, given each user's daily rate. Sorted by timestamp ascending.
pub fn generate_events(
    rates: &[u32],
    horizon_hours: u32,
    rng: &mut DeterministicRng,
) -> Vec<SendEvent> {
    let mut events = Vec::new();
    for hour in 0..horizon_hours {
        let mult = DIURNAL_MULTIPLIERS[(hour % HOURS_PER_DAY) as usize];
        let hour_start_ms = hour as u64 * HOUR_MS;
        for (user, &rate) in rates.iter().enumerate() {
            let p = (rate as f64 / HOURS_PER_DAY as f64 * mult).min(0.8);
            if rng.next_bool(p) {
                let count = 1 + rng.next_below(3);
                for _ in 0..count {
                    let offset = (rng.next_f64() * HOUR_MS as f64) as u64;
                    events.push(SendEvent {
                        user,
                        t_ms: hour_start_ms + offset,
                    });
                }
            }
        }
    }
    events.sort_by_key(|e| e.t_ms);
    events
}
