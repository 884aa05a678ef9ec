//! Discrete-event simulator for metadata privacy of a decentralized mesh
//! messaging protocol under a local-passive adversary.
//!
//! [`run_full_experiment`] wires the pieces together end to end: load or
//! generate the social graph for a key, run one experiment against it, and
//! evaluate the adversary's output. Everything else in this crate is a
//! component that function drives.

pub mod adversary;
pub mod conversation;
pub mod cover;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod groundtruth;
pub mod message;
pub mod observer;
pub mod orchestrator;
pub mod output;
pub mod rng;
pub mod routing;
pub mod settings;
pub mod temporal;
pub mod user;

use error::SimResult;
use groundtruth::{GroundTruthStore, GroundTruthKey};
use output::RunResult;
use rng::DeterministicRng;
use settings::SimulationSettings;

/// Runs one full experiment for `settings`: loads (or generates and
/// persists) the social graph for its `(users, seed, tiers)` key, drives the
/// sub-epoch loop, and evaluates the result.
pub fn run_full_experiment(
    store: &dyn GroundTruthStore,
    settings: &SimulationSettings,
) -> SimResult<RunResult> {
    settings.validate()?;

    let key = GroundTruthKey {
        n: settings.users,
        seed: settings.seed,
        tiers: settings.tiers,
    };
    let mut graph_rng = DeterministicRng::new(settings.seed);
    let (graph, _statistics) = groundtruth::load_or_generate(store, &key, &mut graph_rng)?;

    let outcome = orchestrator::run_experiment(settings, &graph)?;
    let report = evaluator::evaluate(&outcome.log, &graph, &outcome.adversary, outcome.conversation_stats);

    Ok(RunResult::assemble(settings, key.filename(), &outcome, report))
}
