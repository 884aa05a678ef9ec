//! Per-user daily message rates (spec.md 4.3, `sampleUserMeans`).

use crate::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemporalSettings {
    pub min_per_day: u32,
    pub max_per_day: u32,
    #[serde(default = "default_skew")]
    pub skew: f64,
    #[serde(default = "default_heavy_fraction")]
    pub heavy_user_fraction: f64,
}

fn default_skew() -> f64 {
    0.6
}

fn default_heavy_fraction() -> f64 {
    0.15
}

/// Draws one daily send rate per user. A `heavy_user_fraction` slice of
/// users are "heavy" posters whose rate leans toward the top of the range;
/// everyone else is skewed toward the bottom via `U^skew`.
pub fn sample_user_means(n: usize, settings: &TemporalSettings, rng: &mut DeterministicRng) -> Vec<u32> {
    let span = (settings.max_per_day - settings.min_per_day) as f64;
    (0..n)
        .map(|_| {
            let is_heavy = rng.next_bool(settings.heavy_user_fraction);
            let u = rng.next_f64();
            let rate = if is_heavy {
                settings.min_per_day as f64 + u * span * 0.8
            } else {
                settings.min_per_day as f64 + u.powf(settings.skew) * span * 0.4
            };
            rate.round() as u32
        })
        .collect()
}
