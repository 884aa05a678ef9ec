//! C8: Simulation Orchestrator.
//!
//! Owns every other manager for one experiment and drives the sub-epoch
//! loop (spec.md 4.7): replies, then new sends, then cover injection at the
//! top of each hour, then materialization and adversary notification at
//! the close of each hour. No state here is shared across experiments --
//! a fresh orchestrator is constructed per run (see spec.md section 5).

use crate::adversary::AdversaryEngine;
use crate::conversation::{ConversationStats, ReplyScheduler};
use crate::cover::CoverTrafficManager;
use crate::error::SimResult;
use crate::graph::{NodeId, SocialGraph, Tier, UnorderedPair};
use crate::message::{Epoch, MessageId, MessageRecord};
use crate::observer;
use crate::rng::DeterministicRng;
use crate::routing::{self, DiversityTracker};
use crate::settings::SimulationSettings;
use crate::temporal::{self, subepoch};
use crate::user::{self, User};
use std::collections::HashMap;

fn tier_weight(tier: Tier) -> f64 {
    match tier {
        Tier::Intimate => 3.0,
        Tier::Friend => 1.5,
        Tier::Acquaintance => 1.0,
    }
}

/// Picks a recipient among `sender`'s neighbors, weighted by tier
/// (`intimate:3.0, friend:1.5, acquaintance:1.0`). `None` if `sender` has
/// no neighbors (an isolated node, which per spec.md never appears as a
/// sender).
fn choose_recipient(graph: &SocialGraph, sender: NodeId, rng: &mut DeterministicRng) -> Option<NodeId> {
    let neighbors = graph.neighbors(sender);
    if neighbors.is_empty() {
        return None;
    }
    let weights: Vec<f64> = neighbors
        .iter()
        .map(|&v| tier_weight(graph.tier(sender, v).unwrap()))
        .collect();
    let total: f64 = weights.iter().sum();
    let r = rng.next_f64() * total;
    let mut acc = 0.0;
    for (&v, &w) in neighbors.iter().zip(weights.iter()) {
        acc += w;
        if r < acc {
            return Some(v);
        }
    }
    neighbors.last().copied()
}

pub struct ExperimentOutcome {
    pub log: Vec<MessageRecord>,
    pub conversation_stats: ConversationStats,
    pub adversary: AdversaryEngine,
    pub observed: std::collections::HashSet<NodeId>,
}

/// Runs one full experiment against an already-built social graph.
pub fn run_experiment(settings: &SimulationSettings, graph: &SocialGraph) -> SimResult<ExperimentOutcome> {
    settings.validate()?;

    let mut rng = DeterministicRng::new(settings.seed);
    let mut temporal_rng = DeterministicRng::new(settings.seed);

    let sub_epoch_events = temporal::build_sub_epoch_events(
        settings.users,
        settings.horizon as u32,
        &settings.temporal,
        &Default::default(),
        &mut temporal_rng,
    );
    let total_sub_epochs = sub_epoch_events.len();

    let observed = observer::place_observers(graph, settings.observers.count, settings.observers.placement, &mut rng);
    let mut adversary = AdversaryEngine::new(observed.clone());
    let mut diversity = DiversityTracker::new();
    let mut reply_scheduler = ReplyScheduler::new(total_sub_epochs);
    let mut cover_mgr = settings.cover_traffic.map(CoverTrafficManager::new);
    let mut users = user::new_population(settings.users);

    let mut log: Vec<MessageRecord> = Vec::new();
    let mut next_id: MessageId = 0;
    let mut hop_edges_by_epoch: HashMap<Epoch, Vec<UnorderedPair>> = HashMap::new();

    for se in 0..total_sub_epochs {
        let t = subepoch::epoch_of(se);

        // 1. Replies.
        for (sender, recipient) in reply_scheduler.process_sub_epoch(graph, se, t, &mut rng) {
            if let Some(path) = routing::select_path(graph, sender, recipient, settings.h_max, &mut diversity, &mut rng) {
                emit_message(
                    path,
                    t,
                    false,
                    true,
                    settings.horizon,
                    &mut log,
                    &mut next_id,
                    &mut hop_edges_by_epoch,
                    cover_mgr.as_mut(),
                    &mut adversary,
                );
            }
        }

        // 2. New sends.
        for &sender in &sub_epoch_events[se] {
            let Some(recipient) = choose_recipient(graph, sender, &mut rng) else {
                continue;
            };
            let Some(path) = routing::select_path(graph, sender, recipient, settings.h_max, &mut diversity, &mut rng)
            else {
                continue;
            };
            emit_message(
                path,
                t,
                false,
                false,
                settings.horizon,
                &mut log,
                &mut next_id,
                &mut hop_edges_by_epoch,
                cover_mgr.as_mut(),
                &mut adversary,
            );
            reply_scheduler.maybe_schedule_reply(graph, sender, recipient, t, &mut rng);
        }

        // 3. Cover injection, only at the top of each hour.
        if se % subepoch::SUB_EPOCHS_PER_HOUR as usize == 0 {
            if let Some(mgr) = cover_mgr.as_mut() {
                let dummies = mgr.inject_epoch(t, graph, &mut rng);
                for (u, v) in dummies {
                    emit_message(
                        vec![u, v],
                        t,
                        true,
                        false,
                        settings.horizon,
                        &mut log,
                        &mut next_id,
                        &mut hop_edges_by_epoch,
                        None,
                        &mut adversary,
                    );
                }
            }
        }

        // 4. Materialization, at the close of each hour.
        if se % subepoch::SUB_EPOCHS_PER_HOUR as usize == subepoch::SUB_EPOCHS_PER_HOUR as usize - 1 {
            let hops = hop_edges_by_epoch.remove(&t).unwrap_or_default();
            let mut counts: HashMap<UnorderedPair, u32> = HashMap::new();
            for pair in hops {
                *counts.entry(pair).or_insert(0) += 1;
            }
            add_noise_edges(graph, settings.noise_edges_per_epoch, &mut counts, &mut rng);

            for (pair, count) in &counts {
                if *count == 0 {
                    continue;
                }
                users[pair.0].note_contact(pair.1, t);
                users[pair.1].note_contact(pair.0, t);
                adversary.note_contact(t, pair.0, pair.1, *count);
            }
            adversary.infer_epoch(t, graph);
        }
    }

    adversary.finalize();
    Ok(ExperimentOutcome {
        log,
        conversation_stats: reply_scheduler.stats(),
        adversary,
        observed,
    })
}

/// Logs one message (real, reply, or dummy), notifies the adversary's
/// `noteSend` identically regardless of `dummy` (spec.md Testable
/// Properties, "Cover tagging"), and records each hop-edge traversal for
/// later materialization. Cover events are already folded into the cover
/// manager's own history inside `inject_epoch`, so `cover_mgr` is only
/// consulted for non-dummy sends.
#[allow(clippy::too_many_arguments)]
fn emit_message(
    path: Vec<NodeId>,
    t: Epoch,
    dummy: bool,
    is_reply: bool,
    horizon: Epoch,
    log: &mut Vec<MessageRecord>,
    next_id: &mut MessageId,
    hop_edges_by_epoch: &mut HashMap<Epoch, Vec<UnorderedPair>>,
    cover_mgr: Option<&mut CoverTrafficManager>,
    adversary: &mut AdversaryEngine,
) {
    let sender = path[0];
    adversary.note_send(t, sender);
    let mut cover_mgr = cover_mgr;
    for (i, w) in path.windows(2).enumerate() {
        let hop_epoch = (t + i).min(horizon);
        hop_edges_by_epoch
            .entry(hop_epoch)
            .or_default()
            .push(UnorderedPair::new(w[0], w[1]));
        if !dummy {
            if let Some(mgr) = cover_mgr.as_deref_mut() {
                mgr.record_real_message(w[0], w[1], hop_epoch);
            }
        }
    }
    let record = MessageRecord::new(t, *next_id, path, horizon, dummy, is_reply);
    *next_id += 1;
    log.push(record);
}

fn add_noise_edges(
    graph: &SocialGraph,
    n: usize,
    counts: &mut HashMap<UnorderedPair, u32>,
    rng: &mut DeterministicRng,
) {
    if n == 0 {
        return;
    }
    let edges: Vec<UnorderedPair> = graph.edges().collect();
    if edges.is_empty() {
        return;
    }
    for _ in 0..n {
        let pair = edges[rng.next_below(edges.len())];
        *counts.entry(pair).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::CoverTrafficSettings;
    use crate::graph::builder::{self, GraphBuilderParams, TierProbabilities};
    use crate::observer::Placement;
    use crate::settings::ObserverSettings;
    use crate::temporal::TemporalSettings;

    fn graph(n: usize, seed: u64) -> SocialGraph {
        let params = GraphBuilderParams {
            users: n,
            tiers: TierProbabilities {
                p_intimate: 0.04,
                p_friend: 0.1,
                p_acquaintance: 0.2,
                p_bridge: 0.1,
            },
            seed,
            band_multiplier: 2,
            bridge_sample: 3,
        };
        let mut rng = DeterministicRng::new(seed);
        builder::build_graph(&params, &mut rng, None)
    }

    fn settings(cover: Option<CoverTrafficSettings>) -> SimulationSettings {
        SimulationSettings {
            users: 40,
            tiers: TierProbabilities {
                p_intimate: 0.04,
                p_friend: 0.1,
                p_acquaintance: 0.2,
                p_bridge: 0.1,
            },
            seed: 3,
            horizon: 48,
            h_max: 3,
            observers: ObserverSettings { count: 5, placement: Placement::Random },
            temporal: TemporalSettings {
                min_per_day: 2,
                max_per_day: 15,
                skew: 0.6,
                heavy_user_fraction: 0.15,
            },
            cover_traffic: cover,
            noise_edges_per_epoch: 0,
        }
    }

    #[test]
    fn produces_nonempty_log_and_guesses() {
        let g = graph(40, 3);
        let s = settings(None);
        let outcome = run_experiment(&s, &g).unwrap();
        assert!(!outcome.log.is_empty());
        assert!(!outcome.adversary.guesses().is_empty());
        assert!(outcome.log.iter().all(|m| !m.dummy));
    }

    #[test]
    fn determinism_same_seed_same_log() {
        let g = graph(40, 3);
        let s = settings(None);
        let a = run_experiment(&s, &g).unwrap();
        let b = run_experiment(&s, &g).unwrap();
        assert_eq!(a.log.len(), b.log.len());
        for (ra, rb) in a.log.iter().zip(b.log.iter()) {
            assert_eq!(ra.path, rb.path);
            assert_eq!(ra.t, rb.t);
        }
    }

    #[test]
    fn cover_traffic_produces_dummy_fraction_between_bounds() {
        let g = graph(40, 3);
        let cover = CoverTrafficSettings {
            target_multiplier: 0.3,
            min_target: 1.0,
            max_target: 10.0,
            window_size: 6,
            noise_stddev: 0.3,
            probability_threshold: 0.9,
        };
        let s = settings(Some(cover));
        let outcome = run_experiment(&s, &g).unwrap();
        let dummy_count = outcome.log.iter().filter(|m| m.dummy).count();
        assert!(dummy_count > 0);
        assert!((dummy_count as f64) < outcome.log.len() as f64);
    }
}
