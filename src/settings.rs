//! Experiment configuration. Everything the simulation itself consumes is
//! expressed in epochs/sub-epochs rather than wall time; the one
//! wall-clock-facing field, `SweepSettings::run_timeout`, is a sweep-driver
//! concern and is (de)serialized with `humantime_serde` so config files can
//! write `"2h"` instead of a raw nanosecond count.

use crate::cover::CoverTrafficSettings;
use crate::error::{SimError, SimResult};
use crate::graph::builder::TierProbabilities;
use crate::observer::Placement;
use crate::temporal::rates::TemporalSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObserverSettings {
    pub count: usize,
    pub placement: Placement,
}

/// Parameters for a single experiment (one point in the sweep grid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub users: usize,
    pub tiers: TierProbabilities,
    pub seed: u64,
    /// Horizon in epochs (simulated hours).
    pub horizon: usize,
    pub h_max: usize,
    pub observers: ObserverSettings,
    pub temporal: TemporalSettings,
    pub cover_traffic: Option<CoverTrafficSettings>,
    /// Extra random real-edge packets materialized per epoch, independent
    /// of any traffic actually routed over them (spec.md 4.7).
    pub noise_edges_per_epoch: usize,
}

impl SimulationSettings {
    pub fn validate(&self) -> SimResult<()> {
        if self.users < 2 {
            return Err(SimError::InvalidSettings("users must be >= 2".into()));
        }
        if self.horizon == 0 {
            return Err(SimError::InvalidSettings("horizon must be > 0".into()));
        }
        if self.h_max == 0 {
            return Err(SimError::InvalidSettings("h_max must be > 0".into()));
        }
        if self.observers.count == 0 {
            return Err(SimError::InvalidSettings(
                "observer count must be > 0 (use an empty sweep entry to model 0 observers)".into(),
            ));
        }
        Ok(())
    }
}

/// The sweep driver's surface (spec.md section 6, "Sweep parameters").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    pub users: Vec<usize>,
    pub h_max: Vec<usize>,
    pub seeds: Vec<u64>,
    pub observer_counts: Vec<usize>,
    pub placements: Vec<Placement>,
    pub poison_rates: Vec<f64>,
    pub horizon: usize,
    pub output_dir: String,
    pub ground_truth_dir: String,
    #[serde(default, with = "humantime_serde::option")]
    pub run_timeout: Option<std::time::Duration>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            users: vec![50, 75, 100, 150, 200, 300, 400],
            h_max: vec![1, 3],
            seeds: (0..10).collect(),
            observer_counts: vec![5, 10],
            placements: vec![Placement::Random, Placement::HighDegree, Placement::Cluster],
            poison_rates: vec![0.0, 0.05, 0.1],
            horizon: 200,
            output_dir: "./out".to_string(),
            ground_truth_dir: "./ground_truth".to_string(),
            run_timeout: None,
        }
    }
}
