//! Thin CLI sweep driver (spec.md section 6): iterates the parameter grid,
//! runs one experiment per grid point against the library's public API, and
//! aggregates `out/summary.json`. None of the simulation logic lives here --
//! this binary only parses arguments, manages the ground-truth and output
//! directories, and folds already-computed `RunResult`s.

mod log;

use clap::Parser;
use mesh_privacy_sim::cover::CoverTrafficSettings;
use mesh_privacy_sim::graph::builder::TierProbabilities;
use mesh_privacy_sim::groundtruth::FsGroundTruthStore;
use mesh_privacy_sim::observer::Placement;
use mesh_privacy_sim::output::RunResult;
use mesh_privacy_sim::settings::{ObserverSettings, SimulationSettings, SweepSettings};
use mesh_privacy_sim::temporal::TemporalSettings;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default tier probabilities and temporal shape for every sweep point;
/// these are not part of the grid itself (spec.md section 6 only grids
/// `N, Hmax, seeds, obsCounts, placements, poisonRates`).
const TIER_PROBABILITIES: TierProbabilities = TierProbabilities {
    p_intimate: 0.04,
    p_friend: 0.1,
    p_acquaintance: 0.2,
    p_bridge: 0.1,
};

const TEMPORAL_SETTINGS: TemporalSettings = TemporalSettings {
    min_per_day: 2,
    max_per_day: 15,
    skew: 0.6,
    heavy_user_fraction: 0.15,
};

#[derive(Parser)]
struct Cli {
    /// JSON file in `SweepSettings` format; falls back to the built-in
    /// default grid (spec.md section 6) if omitted.
    #[clap(long, short)]
    sweep_settings: Option<PathBuf>,
    #[clap(long)]
    out_dir: Option<PathBuf>,
    #[clap(long)]
    ground_truth_dir: Option<PathBuf>,
    #[clap(long, value_enum, default_value = "plain")]
    log_format: log::LogFormat,
    #[clap(long, default_value = "stdout")]
    log_to: log::LogOutput,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
struct SummaryMetrics {
    runs: usize,
    failures: usize,
    mean_accuracy: f64,
    mean_dummy_fraction: f64,
    mean_graph_f1: f64,
    mean_replies: f64,
}

fn load_json_from_file<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let f = File::open(path).map_err(|e| anyhow::anyhow!("opening {}: {e}", path.display()))?;
    Ok(serde_json::from_reader(f)?)
}

fn cover_traffic_for(poison_rate: f64) -> Option<CoverTrafficSettings> {
    if poison_rate <= 0.0 {
        return None;
    }
    Some(CoverTrafficSettings {
        target_multiplier: poison_rate,
        min_target: 1.0,
        max_target: 20.0,
        window_size: 12,
        noise_stddev: 0.5,
        probability_threshold: 0.9,
    })
}

struct GridPoint {
    users: usize,
    h_max: usize,
    seed: u64,
    observer_count: usize,
    placement: Placement,
    poison_rate: f64,
}

fn grid(sweep: &SweepSettings) -> Vec<GridPoint> {
    let mut points = Vec::new();
    for &users in &sweep.users {
        for &h_max in &sweep.h_max {
            for &seed in &sweep.seeds {
                for &observer_count in &sweep.observer_counts {
                    for &placement in &sweep.placements {
                        for &poison_rate in &sweep.poison_rates {
                            points.push(GridPoint {
                                users,
                                h_max,
                                seed,
                                observer_count,
                                placement,
                                poison_rate,
                            });
                        }
                    }
                }
            }
        }
    }
    points
}

fn settings_for(sweep: &SweepSettings, point: &GridPoint) -> SimulationSettings {
    SimulationSettings {
        users: point.users,
        tiers: TIER_PROBABILITIES,
        seed: point.seed,
        horizon: sweep.horizon,
        h_max: point.h_max,
        observers: ObserverSettings {
            count: point.observer_count,
            placement: point.placement,
        },
        temporal: TEMPORAL_SETTINGS,
        cover_traffic: cover_traffic_for(point.poison_rate),
        noise_edges_per_epoch: 0,
    }
}

fn run_name(point: &GridPoint) -> String {
    format!(
        "run_N{}_h{}_seed{}_obs{}_{:?}_poison{}.json",
        point.users, point.h_max, point.seed, point.observer_count, point.placement, point.poison_rate
    )
    .replace('.', "_")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = log::config_tracing(cli.log_format, &cli.log_to);

    let mut sweep: SweepSettings = match &cli.sweep_settings {
        Some(path) => load_json_from_file(path)?,
        None => SweepSettings::default(),
    };
    if let Some(out_dir) = &cli.out_dir {
        sweep.output_dir = out_dir.to_string_lossy().to_string();
    }
    if let Some(gt_dir) = &cli.ground_truth_dir {
        sweep.ground_truth_dir = gt_dir.to_string_lossy().to_string();
    }

    std::fs::create_dir_all(&sweep.output_dir)?;
    let store = FsGroundTruthStore::new(sweep.ground_truth_dir.clone());

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            tracing::warn!("received interrupt, finishing in-flight runs and writing partial summary");
            stop.store(true, Ordering::SeqCst);
        })?;
    }

    let points = grid(&sweep);
    tracing::info!(total = points.len(), "starting sweep");

    let summary = Mutex::new(SummaryMetrics::default());
    let out_dir = PathBuf::from(&sweep.output_dir);

    points.par_iter().for_each(|point| {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let settings = settings_for(&sweep, point);
        match mesh_privacy_sim::run_full_experiment(&store, &settings) {
            Ok(result) => {
                if let Err(e) = write_run_result(&out_dir, point, &result) {
                    tracing::error!(?e, "failed to write run result");
                }
                fold_into_summary(&summary, &result);
            }
            Err(e) => {
                tracing::error!(
                    users = point.users,
                    h_max = point.h_max,
                    seed = point.seed,
                    error = %e,
                    "sweep point failed"
                );
                summary.lock().failures += 1;
            }
        }
    });

    let mut final_summary = summary.into_inner();
    if final_summary.runs > 0 {
        let n = final_summary.runs as f64;
        final_summary.mean_accuracy /= n;
        final_summary.mean_dummy_fraction /= n;
        final_summary.mean_graph_f1 /= n;
        final_summary.mean_replies /= n;
    }

    let summary_path = out_dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_vec_pretty(&final_summary)?)?;
    tracing::info!(path = %summary_path.display(), "wrote sweep summary");
    Ok(())
}

fn write_run_result(out_dir: &Path, point: &GridPoint, result: &RunResult) -> anyhow::Result<()> {
    let path = out_dir.join(run_name(point));
    std::fs::write(&path, serde_json::to_vec_pretty(result)?)?;
    Ok(())
}

fn fold_into_summary(summary: &Mutex<SummaryMetrics>, result: &RunResult) {
    let mut s = summary.lock();
    s.runs += 1;
    s.mean_accuracy += result.results.accuracy.rate();
    s.mean_dummy_fraction += result.results.cover_traffic.dummy_fraction;
    s.mean_graph_f1 += result.results.graph_reconstruction.edges.f1;
    s.mean_replies += result.results.conversation.reply_count as f64;
}
