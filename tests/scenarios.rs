//! End-to-end scenarios and boundary behaviors (spec.md section 8).

use mesh_privacy_sim::cover::CoverTrafficSettings;
use mesh_privacy_sim::graph::builder::TierProbabilities;
use mesh_privacy_sim::graph::{SocialGraph, Tier};
use mesh_privacy_sim::groundtruth::{FsGroundTruthStore, GroundTruthKey};
use mesh_privacy_sim::observer::Placement;
use mesh_privacy_sim::orchestrator;
use mesh_privacy_sim::rng::DeterministicRng;
use mesh_privacy_sim::settings::{ObserverSettings, SimulationSettings};
use mesh_privacy_sim::temporal::TemporalSettings;

fn tiers() -> TierProbabilities {
    TierProbabilities {
        p_intimate: 0.04,
        p_friend: 0.1,
        p_acquaintance: 0.2,
        p_bridge: 0.1,
    }
}

fn temporal() -> TemporalSettings {
    TemporalSettings {
        min_per_day: 2,
        max_per_day: 15,
        skew: 0.6,
        heavy_user_fraction: 0.15,
    }
}

fn graph_for(n: usize, seed: u64, dir: &tempfile::TempDir) -> SocialGraph {
    let store = FsGroundTruthStore::new(dir.path());
    let key = GroundTruthKey { n, seed, tiers: tiers() };
    let mut rng = DeterministicRng::new(seed);
    mesh_privacy_sim::groundtruth::load_or_generate(&store, &key, &mut rng)
        .unwrap()
        .0
}

fn base_settings(users: usize, seed: u64, h_max: usize, observer_count: usize, placement: Placement) -> SimulationSettings {
    SimulationSettings {
        users,
        tiers: tiers(),
        seed,
        horizon: 200,
        h_max,
        observers: ObserverSettings { count: observer_count, placement },
        temporal: temporal(),
        cover_traffic: None,
        noise_edges_per_epoch: 0,
    }
}

/// Scenario 1: N=50, seed=3, T=200, Hmax=1, observers=5, random, cover
/// disabled -- sends happen, the adversary guesses something, and the
/// dummy fraction is exactly zero.
#[test]
fn scenario_1_hmax_1_no_cover() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(50, 3, &dir);
    let settings = base_settings(50, 3, 1, 5, Placement::Random);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();

    assert!(!outcome.log.is_empty());
    assert!(!outcome.adversary.guesses().is_empty());
    assert!(outcome.log.iter().all(|m| !m.dummy));

    let report = mesh_privacy_sim::evaluator::evaluate(&outcome.log, &graph, &outcome.adversary, outcome.conversation_stats);
    assert_eq!(report.cover_traffic.dummy_fraction, 0.0);
}

/// Scenario 2: same as scenario 1 but Hmax=3 -- more hop budget should not
/// shrink the average path length or routing diversity relative to Hmax=1.
#[test]
fn scenario_2_more_hops_does_not_shrink_routing_stats() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(50, 3, &dir);

    let s1 = base_settings(50, 3, 1, 5, Placement::Random);
    let o1 = orchestrator::run_experiment(&s1, &graph).unwrap();
    let r1 = mesh_privacy_sim::evaluator::evaluate(&o1.log, &graph, &o1.adversary, o1.conversation_stats);

    let s3 = base_settings(50, 3, 3, 5, Placement::Random);
    let o3 = orchestrator::run_experiment(&s3, &graph).unwrap();
    let r3 = mesh_privacy_sim::evaluator::evaluate(&o3.log, &graph, &o3.adversary, o3.conversation_stats);

    assert!(r3.routing.avg_path_length >= r1.routing.avg_path_length - 1e-9);
    assert!(r3.routing.diversity >= r1.routing.diversity - 1e-9);
}

/// Scenario 3: N=100, seed=42, Hmax=3, observers=5, high-degree placement,
/// cover enabled(targetMultiplier=0.3) -- dummy fraction lands strictly
/// between 0 and 0.5.
#[test]
fn scenario_3_cover_traffic_dummy_fraction_in_range() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(100, 42, &dir);
    let mut settings = base_settings(100, 42, 3, 5, Placement::HighDegree);
    settings.cover_traffic = Some(CoverTrafficSettings {
        target_multiplier: 0.3,
        min_target: 1.0,
        max_target: 20.0,
        window_size: 12,
        noise_stddev: 0.5,
        probability_threshold: 0.9,
    });

    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();
    let report = mesh_privacy_sim::evaluator::evaluate(&outcome.log, &graph, &outcome.adversary, outcome.conversation_stats);

    assert!(report.cover_traffic.dummy_fraction > 0.0);
    assert!(report.cover_traffic.dummy_fraction < 0.5);
}

/// Scenario 4: N=100, seed=42, Hmax=3, observers=5, cluster placement,
/// cover disabled -- community detection over the adversary's estimated
/// graph must emit more than one distinct label.
#[test]
fn scenario_4_cluster_placement_yields_multiple_communities() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(100, 42, &dir);
    let settings = base_settings(100, 42, 3, 5, Placement::Cluster);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();

    let mut rng = DeterministicRng::new(99);
    let labels = outcome.adversary.community_labels(graph.user_count(), &mut rng);
    let distinct: std::collections::HashSet<_> = labels.values().copied().collect();
    assert!(distinct.len() > 1, "expected more than one community label, got {}", distinct.len());
}

/// Scenario 6: every logged reply corresponds to a `ConversationThread`
/// continuation accept, so `sum(isReply=true) <= attempted reply schedules`
/// and every such message carries a valid sender/recipient edge.
#[test]
fn scenario_6_replies_are_consistent_with_thread_accounting() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(60, 7, &dir);
    let settings = base_settings(60, 7, 3, 5, Placement::Random);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();

    let reply_count = outcome.log.iter().filter(|m| m.is_reply).count();
    assert!(reply_count as u64 <= outcome.conversation_stats.thread_count as u64 * 5);
    for m in outcome.log.iter().filter(|m| m.is_reply) {
        for w in m.path.windows(2) {
            assert!(graph.has_edge(w[0], w[1]));
        }
    }
}

/// Boundary: Hmax=1 and no direct edge between two chosen nodes means the
/// send is skipped -- never logged, never reported to the adversary.
#[test]
fn boundary_hmax_1_skips_sends_with_no_direct_edge() {
    let mut graph = SocialGraph::empty(4);
    graph.add_edge(0, 1, Tier::Friend);
    graph.add_edge(2, 3, Tier::Friend);

    let settings = base_settings(4, 1, 1, 1, Placement::Random);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();
    for m in &outcome.log {
        assert!(graph.has_edge(m.sender, m.recipient));
    }
}

/// Boundary: an isolated node never appears as a sender.
#[test]
fn boundary_isolated_node_never_sends() {
    let mut graph = SocialGraph::empty(5);
    graph.add_edge(0, 1, Tier::Friend);
    graph.add_edge(1, 2, Tier::Acquaintance);
    graph.add_edge(2, 3, Tier::Friend);
    // node 4 stays isolated.

    let settings = base_settings(5, 2, 2, 1, Placement::Random);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();
    assert!(outcome.log.iter().all(|m| m.sender != 4));
}

/// Boundary: cover disabled implies dummy fraction is exactly zero.
#[test]
fn boundary_cover_disabled_means_zero_dummy_fraction() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(40, 13, &dir);
    let settings = base_settings(40, 13, 2, 4, Placement::Random);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();
    let report = mesh_privacy_sim::evaluator::evaluate(&outcome.log, &graph, &outcome.adversary, outcome.conversation_stats);
    assert_eq!(report.cover_traffic.dummy_fraction, 0.0);
}

/// Boundary: an empty observed set means accuracy is reported as zero with
/// zero total, never a division-by-zero panic.
#[test]
fn boundary_empty_observers_yields_zero_accuracy() {
    let dir = tempfile::tempdir().unwrap();
    let graph = graph_for(30, 4, &dir);
    // `run_experiment` validates `observers.count > 0`, so the zero-observer
    // boundary is modeled here by evaluating against an adversary built with
    // an explicitly empty observed set, fed the same message log.
    let settings = base_settings(30, 4, 2, 1, Placement::Random);
    let outcome = orchestrator::run_experiment(&settings, &graph).unwrap();

    let empty_adversary = mesh_privacy_sim::adversary::AdversaryEngine::new(Default::default());
    let report = mesh_privacy_sim::evaluator::evaluate(&outcome.log, &graph, &empty_adversary, outcome.conversation_stats);
    assert_eq!(report.accuracy.total, 0);
    assert_eq!(report.accuracy.rate(), 0.0);
}
