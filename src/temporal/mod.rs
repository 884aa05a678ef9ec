//! C3 (Temporal Model) + C4 (Sub-Epoch Distributor).

pub mod events;
pub mod rates;
pub mod subepoch;

pub use events::SendEvent;
pub use rates::TemporalSettings;
pub use subepoch::SubEpochSettings;

use crate::graph::NodeId;
use crate::rng::DeterministicRng;

/// Runs the full temporal pipeline: per-user rates -> timestamped events ->
/// sub-epoch buckets. Constructed from its own RNG stream (seeded
/// independently, see spec.md Design Notes) so that toggling cover traffic
/// never perturbs this sequence.
pub fn build_sub_epoch_events(
    n_users: usize,
    horizon_hours: u32,
    temporal: &TemporalSettings,
    sub_epoch: &SubEpochSettings,
    rng: &mut DeterministicRng,
) -> Vec<Vec<NodeId>> {
    let rates = rates::sample_user_means(n_users, temporal, rng);
    let events = events::generate_events(&rates, horizon_hours, rng);
    subepoch::distribute(&events, horizon_hours, sub_epoch, rng)
}
