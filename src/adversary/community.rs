//! Label propagation community detection over the adversary's estimated
//! graph (spec.md 4.8). Labels are deliberately unstable across runs -- the
//! per-pass shuffle draws from the same shared RNG stream used for routing
//! and replies -- so only the *count* of distinct labels is meaningful,
//! never label identity (spec.md Design Notes).

use crate::graph::NodeId;
use crate::rng::DeterministicRng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

const MAX_PASSES: usize = 20;

pub fn label_propagation(
    neighbors: &HashMap<NodeId, HashSet<NodeId>>,
    node_count: usize,
    rng: &mut DeterministicRng,
) -> HashMap<NodeId, NodeId> {
    let mut labels: HashMap<NodeId, NodeId> = (0..node_count).map(|n| (n, n)).collect();
    let mut order: Vec<NodeId> = (0..node_count).collect();

    for _ in 0..MAX_PASSES {
        order.shuffle(rng);
        let mut changed = false;
        for &node in &order {
            let Some(peers) = neighbors.get(&node) else {
                continue;
            };
            if peers.is_empty() {
                continue;
            }
            let mut counts: HashMap<NodeId, usize> = HashMap::new();
            for &peer in peers {
                *counts.entry(labels[&peer]).or_insert(0) += 1;
            }
            let current = labels[&node];
            let current_count = *counts.get(&current).unwrap_or(&0);
            let (best_label, best_count) = counts
                .iter()
                .max_by_key(|&(_, &c)| c)
                .map(|(&l, &c)| (l, c))
                .unwrap();
            if best_count > current_count {
                labels.insert(node, best_label);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    labels
}

pub fn distinct_label_count(labels: &HashMap<NodeId, NodeId>) -> usize {
    labels.values().collect::<HashSet<_>>().len()
}
