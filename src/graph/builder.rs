//! C2: Graph Builder.
//!
//! Builds a tiered small-world social graph: per-user degree targets split
//! across intimate/friend/acquaintance bands, each band filled by
//! Efraimidis-Spirakis weighted sampling without replacement over the
//! nearest still-unpicked peers, followed by a bridge pass that adds a few
//! long-range acquaintance edges per node.

use super::{NodeId, SocialGraph, Tier};
use crate::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierProbabilities {
    pub p_intimate: f64,
    pub p_friend: f64,
    pub p_acquaintance: f64,
    pub p_bridge: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphBuilderParams {
    pub users: usize,
    pub tiers: TierProbabilities,
    pub seed: u64,
    #[serde(default = "default_band_multiplier")]
    pub band_multiplier: usize,
    #[serde(default = "default_bridge_sample")]
    pub bridge_sample: usize,
}

fn default_band_multiplier() -> usize {
    2
}

fn default_bridge_sample() -> usize {
    3
}

impl GraphBuilderParams {
    pub fn validate(&self) -> Result<(), crate::error::SimError> {
        if self.users < 2 {
            return Err(crate::error::SimError::InvalidGraphParams(
                "users must be >= 2".into(),
            ));
        }
        Ok(())
    }
}

/// Per-user tier degree targets, following spec.md 4.2 exactly: each target
/// is a floor of a probability times `N-1`, floored at a minimum spacing
/// above the stronger tier's target so weaker tiers are never starved.
fn tier_targets(n: usize, tp: &TierProbabilities) -> (usize, usize, usize) {
    let nm1 = (n - 1) as f64;
    let k_int = ((tp.p_intimate * nm1).floor() as i64).max(1) as usize;
    let k_fri = ((tp.p_friend * nm1).floor() as i64).max(k_int as i64 + 2) as usize;
    let k_acq = ((tp.p_acquaintance * nm1).floor() as i64).max(k_fri as i64 + 3) as usize;
    (k_int, k_fri, k_acq)
}

/// Squared Euclidean distance if spatial coordinates are supplied, otherwise
/// a deterministic pseudo-distance derived from the node-id pair that still
/// produces a clustering bias (nearby ids are "closer").
fn distance(i: NodeId, j: NodeId, n: usize, coords: Option<&[(f64, f64)]>) -> f64 {
    if let Some(coords) = coords {
        let (xi, yi) = coords[i];
        let (xj, yj) = coords[j];
        let dx = xi - xj;
        let dy = yi - yj;
        dx * dx + dy * dy
    } else {
        const A: u64 = 2_654_435_761;
        const B: u64 = 2_246_822_519;
        let hashed = ((i as u64).wrapping_mul(A).wrapping_add((j as u64).wrapping_mul(B)))
            % (1u64 << 32);
        let frac = hashed as f64 / (1u64 << 32) as f64;
        frac * frac * n as f64
    }
}

/// Efraimidis-Spirakis weighted sampling without replacement: each
/// candidate's key is `u^(1/w)` for `u` uniform in `(0,1)`; the items with
/// the largest keys are the selected sample.
fn weighted_sample_without_replacement(
    candidates: &[(NodeId, f64)],
    k: usize,
    rng: &mut DeterministicRng,
) -> Vec<NodeId> {
    let mut keyed: Vec<(f64, NodeId)> = candidates
        .iter()
        .map(|&(id, weight)| {
            let u = rng.next_f64().max(f64::MIN_POSITIVE);
            let key = u.powf(1.0 / weight.max(EPS));
            (key, id)
        })
        .collect();
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    keyed.truncate(k);
    keyed.into_iter().map(|(_, id)| id).collect()
}

/// Fill one tier's worth of edges for `u` from its remaining unpicked,
/// distance-sorted peer list.
fn fill_tier(
    graph: &mut SocialGraph,
    u: NodeId,
    sorted_peers: &[NodeId],
    picked: &mut HashSet<NodeId>,
    k_tier: usize,
    band_multiplier: usize,
    tier: Tier,
    dist_of: impl Fn(NodeId) -> f64,
    rng: &mut DeterministicRng,
) {
    if k_tier == 0 {
        return;
    }
    let band_size = k_tier.max(band_multiplier * k_tier);
    let band: Vec<(NodeId, f64)> = sorted_peers
        .iter()
        .filter(|v| !picked.contains(v))
        .take(band_size)
        .map(|&v| (v, 1.0 / (dist_of(v) + EPS)))
        .collect();
    let selected = weighted_sample_without_replacement(&band, k_tier, rng);
    for v in selected {
        graph.add_edge(u, v, tier);
        picked.insert(v);
    }
}

fn add_bridges(
    graph: &mut SocialGraph,
    n: usize,
    p_bridge: f64,
    bridge_sample: usize,
    rng: &mut DeterministicRng,
) {
    for u in 0..n {
        if !rng.next_bool(p_bridge) {
            continue;
        }
        let neighbors: HashSet<NodeId> = graph.neighbors(u).iter().copied().collect();
        let non_neighbors: Vec<NodeId> = (0..n).filter(|&v| v != u && !neighbors.contains(&v)).collect();
        let mut added = 0usize;
        let total = non_neighbors.len();
        for (idx, v) in non_neighbors.into_iter().enumerate() {
            if added >= bridge_sample {
                break;
            }
            let remaining = total - idx;
            let p = (bridge_sample - added) as f64 / remaining as f64;
            if rng.next_bool(p) {
                graph.add_edge(u, v, Tier::Acquaintance);
                added += 1;
            }
        }
    }
}

pub fn build_graph(
    params: &GraphBuilderParams,
    rng: &mut DeterministicRng,
    coords: Option<&[(f64, f64)]>,
) -> SocialGraph {
    let n = params.users;
    let (k_int, k_fri, k_acq) = tier_targets(n, &params.tiers);
    let mut graph = SocialGraph::empty(n);

    for u in 0..n {
        let mut by_distance: Vec<(NodeId, f64)> = (0..n)
            .filter(|&v| v != u)
            .map(|v| (v, distance(u, v, n, coords)))
            .collect();
        by_distance.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
        let sorted_peers: Vec<NodeId> = by_distance.iter().map(|&(id, _)| id).collect();
        let dist_map: std::collections::HashMap<NodeId, f64> = by_distance.into_iter().collect();

        let mut picked: HashSet<NodeId> = HashSet::new();
        for (k_tier, tier) in [
            (k_int, Tier::Intimate),
            (k_fri, Tier::Friend),
            (k_acq, Tier::Acquaintance),
        ] {
            fill_tier(
                &mut graph,
                u,
                &sorted_peers,
                &mut picked,
                k_tier,
                params.band_multiplier,
                tier,
                |v| dist_map[&v],
                rng,
            );
        }
    }

    add_bridges(&mut graph, n, params.tiers.p_bridge, params.bridge_sample, rng);
    graph
}
