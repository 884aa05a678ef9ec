//! Observer placement strategies (spec.md 6, "Observer placement
//! strategies"). Chosen once per experiment and handed to the adversary
//! engine as its observed-node set.

use crate::graph::{NodeId, SocialGraph};
use crate::rng::DeterministicRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Random,
    HighDegree,
    Cluster,
}

pub fn place_observers(
    graph: &SocialGraph,
    k: usize,
    placement: Placement,
    rng: &mut DeterministicRng,
) -> HashSet<NodeId> {
    let n = graph.user_count();
    let k = k.min(n);
    match placement {
        Placement::Random => random_placement(n, k, rng),
        Placement::HighDegree => high_degree_placement(graph, k),
        Placement::Cluster => cluster_placement(graph, k, rng),
    }
}

fn random_placement(n: usize, k: usize, rng: &mut DeterministicRng) -> HashSet<NodeId> {
    let mut ids: Vec<NodeId> = (0..n).collect();
    ids.shuffle(rng);
    ids.into_iter().take(k).collect()
}

fn high_degree_placement(graph: &SocialGraph, k: usize) -> HashSet<NodeId> {
    let mut ids: Vec<NodeId> = (0..graph.user_count()).collect();
    ids.sort_by(|&a, &b| graph.degree(b).cmp(&graph.degree(a)).then(a.cmp(&b)));
    ids.into_iter().take(k).collect()
}

/// BFS from a random root until `k` nodes are collected; pads with random
/// nodes if the root's component is smaller than `k`.
fn cluster_placement(graph: &SocialGraph, k: usize, rng: &mut DeterministicRng) -> HashSet<NodeId> {
    let n = graph.user_count();
    if n == 0 {
        return HashSet::new();
    }
    let root = rng.next_below(n);
    let mut selected = HashSet::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(root);
    visited.insert(root);
    while let Some(u) = queue.pop_front() {
        if selected.len() >= k {
            break;
        }
        selected.insert(u);
        for &v in graph.neighbors(u) {
            if visited.insert(v) {
                queue.push_back(v);
            }
        }
    }
    if selected.len() < k {
        let mut remaining: Vec<NodeId> = (0..n).filter(|id| !selected.contains(id)).collect();
        remaining.shuffle(rng);
        for id in remaining {
            if selected.len() >= k {
                break;
            }
            selected.insert(id);
        }
    }
    selected
}
