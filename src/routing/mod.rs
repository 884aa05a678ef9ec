//! C5: Path Selector.
//!
//! Computes a BFS shortest path as the baseline, then with the mixture of
//! probabilities in spec.md 4.4 either keeps it, swaps it for a more
//! "diverse" near-shortest alternative, or falls back to a bounded random
//! walk. Diversity accounting lives in [`DiversityTracker`] and is shared
//! across every send in one experiment so routes spread out over time
//! rather than wearing a groove through the same few hub nodes.

use crate::graph::{NodeId, SocialGraph, UnorderedPair};
use crate::rng::DeterministicRng;
use std::collections::{HashMap, HashSet, VecDeque};

const SHORTEST_PATH_PROB: f64 = 0.40;
const NEAR_SHORTEST_PROB: f64 = 0.35;
const STRETCHED_PROB: f64 = 0.20;
// remaining 0.05 is the random-walk branch.

const MAX_DIVERSE_CANDIDATES: usize = 20;
const DIVERSE_SEARCH_BUDGET: usize = 5_000;
const PATH_DECAY: f64 = 0.95;
const USAGE_DAMPING: f64 = 0.1;

#[derive(Debug, Clone, Default)]
pub struct DiversityTracker {
    node_usage: HashMap<NodeId, u32>,
    edge_usage: HashMap<UnorderedPair, u32>,
}

impl DiversityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_score(&self, node: NodeId) -> f64 {
        let usage = *self.node_usage.get(&node).unwrap_or(&0) as f64;
        1.0 / (1.0 + usage * USAGE_DAMPING)
    }

    fn edge_score(&self, edge: UnorderedPair) -> f64 {
        let usage = *self.edge_usage.get(&edge).unwrap_or(&0) as f64;
        1.0 / (1.0 + usage * USAGE_DAMPING)
    }

    pub fn record_path(&mut self, path: &[NodeId]) {
        for &n in path {
            *self.node_usage.entry(n).or_insert(0) += 1;
        }
        for w in path.windows(2) {
            *self.edge_usage.entry(UnorderedPair::new(w[0], w[1])).or_insert(0) += 1;
        }
    }

    fn path_score(&self, path: &[NodeId]) -> f64 {
        let mut score = 0.0;
        for &n in path {
            score += self.node_score(n);
        }
        for w in path.windows(2) {
            score += self.edge_score(UnorderedPair::new(w[0], w[1]));
        }
        score * PATH_DECAY.powi(path.len() as i32)
    }
}

/// Breadth-first shortest path, capped at `h_max + 1` nodes (i.e. `h_max`
/// hops). Returns `None` if no such path exists -- the caller must treat
/// that as a skip, not an error.
pub fn bfs_shortest_path(
    graph: &SocialGraph,
    src: NodeId,
    dst: NodeId,
    h_max: usize,
) -> Option<Vec<NodeId>> {
    if src == dst {
        return Some(vec![src]);
    }
    let max_nodes = h_max + 1;
    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut dist: HashMap<NodeId, usize> = HashMap::new();
    dist.insert(src, 0);
    let mut queue = VecDeque::new();
    queue.push_back(src);
    while let Some(u) = queue.pop_front() {
        let du = dist[&u];
        if du + 1 >= max_nodes {
            continue;
        }
        for &v in graph.neighbors(u) {
            if !dist.contains_key(&v) {
                dist.insert(v, du + 1);
                prev.insert(v, u);
                if v == dst {
                    return Some(reconstruct(&prev, src, dst));
                }
                queue.push_back(v);
            }
        }
    }
    None
}

fn reconstruct(prev: &HashMap<NodeId, NodeId>, src: NodeId, dst: NodeId) -> Vec<NodeId> {
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        cur = prev[&cur];
        path.push(cur);
    }
    path.reverse();
    path
}

/// Enumerates up to [`MAX_DIVERSE_CANDIDATES`] simple paths bounded by
/// `max_len` nodes, scores each by accumulated node/edge diversity decayed
/// by path length, and picks one by roulette-wheel selection.
pub fn find_diverse_path(
    graph: &SocialGraph,
    src: NodeId,
    dst: NodeId,
    max_len: usize,
    diversity: &DiversityTracker,
    rng: &mut DeterministicRng,
) -> Option<Vec<NodeId>> {
    let mut found = Vec::new();
    let mut budget = DIVERSE_SEARCH_BUDGET;
    let mut path = vec![src];
    let mut visited: HashSet<NodeId> = [src].into_iter().collect();
    enumerate_paths(graph, dst, max_len, &mut path, &mut visited, &mut found, &mut budget);

    if found.is_empty() {
        return None;
    }
    let scores: Vec<f64> = found.iter().map(|p| diversity.path_score(p)).collect();
    let total: f64 = scores.iter().sum();
    if total <= 0.0 {
        return found.into_iter().next();
    }
    let r = rng.next_f64() * total;
    let mut acc = 0.0;
    for (path, score) in found.iter().zip(scores.iter()) {
        acc += score;
        if r <= acc {
            return Some(path.clone());
        }
    }
    found.into_iter().last()
}

fn enumerate_paths(
    graph: &SocialGraph,
    dst: NodeId,
    max_len: usize,
    path: &mut Vec<NodeId>,
    visited: &mut HashSet<NodeId>,
    found: &mut Vec<Vec<NodeId>>,
    budget: &mut usize,
) {
    if found.len() >= MAX_DIVERSE_CANDIDATES || *budget == 0 {
        return;
    }
    *budget -= 1;
    let current = *path.last().unwrap();
    if current == dst {
        found.push(path.clone());
        return;
    }
    if path.len() >= max_len {
        return;
    }
    for &next in graph.neighbors(current) {
        if visited.contains(&next) {
            continue;
        }
        visited.insert(next);
        path.push(next);
        enumerate_paths(graph, dst, max_len, path, visited, found, budget);
        path.pop();
        visited.remove(&next);
        if found.len() >= MAX_DIVERSE_CANDIDATES || *budget == 0 {
            return;
        }
    }
}

/// Advances from `src` preferring unvisited neighbors; takes `dst` early
/// with probability 0.3 once adjacent. Falls back to `fallback` (the
/// precomputed BFS shortest path) if the walk dead-ends or exhausts
/// `max_len` without reaching `dst`.
fn random_walk(
    graph: &SocialGraph,
    src: NodeId,
    dst: NodeId,
    max_len: usize,
    rng: &mut DeterministicRng,
) -> Option<Vec<NodeId>> {
    let mut path = vec![src];
    let mut visited: HashSet<NodeId> = [src].into_iter().collect();
    let mut current = src;
    while path.len() < max_len {
        if current == dst {
            return Some(path);
        }
        let neighbors = graph.neighbors(current);
        if neighbors.is_empty() {
            return None;
        }
        if neighbors.contains(&dst) && rng.next_bool(0.3) {
            path.push(dst);
            return Some(path);
        }
        let unvisited: Vec<NodeId> = neighbors.iter().copied().filter(|n| !visited.contains(n)).collect();
        let next = if !unvisited.is_empty() {
            unvisited[rng.next_below(unvisited.len())]
        } else {
            neighbors[rng.next_below(neighbors.len())]
        };
        path.push(next);
        visited.insert(next);
        current = next;
    }
    if current == dst {
        Some(path)
    } else {
        None
    }
}

/// Selects a path for one send, mixing shortest / near-shortest-diverse /
/// stretched-diverse / random-walk strategies per the probabilities in
/// spec.md 4.4. Returns `None` (a skip) if `src` and `dst` are not
/// connected within `h_max` hops.
pub fn select_path(
    graph: &SocialGraph,
    src: NodeId,
    dst: NodeId,
    h_max: usize,
    diversity: &mut DiversityTracker,
    rng: &mut DeterministicRng,
) -> Option<Vec<NodeId>> {
    let shortest = bfs_shortest_path(graph, src, dst, h_max)?;
    let hop_cap = h_max + 1;
    let r = rng.next_f64();

    let path = if r < SHORTEST_PATH_PROB {
        shortest
    } else if r < SHORTEST_PATH_PROB + NEAR_SHORTEST_PROB {
        let max_len = (shortest.len() + 1 + rng.next_below(2)).min(hop_cap);
        find_diverse_path(graph, src, dst, max_len, diversity, rng).unwrap_or(shortest)
    } else if r < SHORTEST_PATH_PROB + NEAR_SHORTEST_PROB + STRETCHED_PROB {
        let max_len = (((shortest.len() as f64) * 1.5).floor() as usize).min(hop_cap);
        find_diverse_path(graph, src, dst, max_len.max(shortest.len()), diversity, rng)
            .unwrap_or(shortest)
    } else {
        let max_len = h_max + 1;
        random_walk(graph, src, dst, max_len, rng).unwrap_or(shortest)
    };

    diversity.record_path(&path);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Tier;

    fn line_graph(n: usize) -> SocialGraph {
        let mut g = SocialGraph::empty(n);
        for i in 0..n - 1 {
            g.add_edge(i, i + 1, Tier::Friend);
        }
        g
    }

    #[test]
    fn shortest_path_respects_hmax() {
        let g = line_graph(10);
        assert!(bfs_shortest_path(&g, 0, 9, 3).is_none());
        let path = bfs_shortest_path(&g, 0, 3, 3).unwrap();
        assert_eq!(path, vec![0, 1, 2, 3]);
    }

    #[test]
    fn select_path_always_valid_when_reachable() {
        let g = line_graph(8);
        let mut rng = DeterministicRng::new(42);
        let mut diversity = DiversityTracker::new();
        for _ in 0..50 {
            if let Some(path) = select_path(&g, 0, 5, 6, &mut diversity, &mut rng) {
                assert_eq!(path[0], 0);
                assert_eq!(*path.last().unwrap(), 5);
                for w in path.windows(2) {
                    assert!(g.has_edge(w[0], w[1]));
                }
            }
        }
    }

    #[test]
    fn no_path_beyond_hmax_is_a_skip() {
        let g = line_graph(8);
        assert!(bfs_shortest_path(&g, 0, 7, 1).is_none());
    }

    #[test]
    fn select_path_never_exceeds_hmax_even_with_a_detour_available() {
        // A triangle gives every diverse-path branch a 2-hop detour (0-2-1)
        // between two directly adjacent nodes; with h_max=1 the selected
        // path must still never exceed h_max+1 = 2 nodes.
        let mut g = SocialGraph::empty(3);
        g.add_edge(0, 1, Tier::Friend);
        g.add_edge(1, 2, Tier::Friend);
        g.add_edge(0, 2, Tier::Friend);

        let mut rng = DeterministicRng::new(1);
        let mut diversity = DiversityTracker::new();
        for _ in 0..200 {
            let path = select_path(&g, 0, 1, 1, &mut diversity, &mut rng).unwrap();
            assert!(path.len() <= 2, "path exceeded h_max+1: {:?}", path);
        }
    }
}
