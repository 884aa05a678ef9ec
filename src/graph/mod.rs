//! C2 data types: the tiered social graph and its tier map.
//!
//! Dense integer node ids index directly into `Vec`s rather than going
//! through a `HashMap<NodeId, _>` -- see spec.md Design Notes,
//! "Graph-as-adjacency". Adjacency lists are small in practice (bounded by
//! `kAcq`, a handful of tens at most) so `SmallVec` avoids a heap
//! allocation per node in the common case.

pub mod builder;
pub mod stats;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

pub type NodeId = usize;

/// Edge strength. Ordering matters: `Intimate > Friend > Acquaintance`, used
/// whenever two candidate tiers for the same edge must be reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Acquaintance,
    Friend,
    Intimate,
}

impl Tier {
    pub fn stronger(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Intimate => "intimate",
            Tier::Friend => "friend",
            Tier::Acquaintance => "acquaintance",
        }
    }
}

/// Canonical unordered-pair key: `(min(u,v), max(u,v))`. Using a sorted
/// tuple rather than string interpolation keeps pair lookups on the hot
/// path (cover traffic, adversary link counts) allocation-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnorderedPair(pub NodeId, pub NodeId);

impl UnorderedPair {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// Undirected, symmetric adjacency: `v in adj(u)` iff `u in adj(v)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialGraph {
    adjacency: Vec<SmallVec<[NodeId; 12]>>,
    tiers: Vec<HashMap<NodeId, Tier>>,
}

impl SocialGraph {
    pub fn empty(users: usize) -> Self {
        Self {
            adjacency: vec![SmallVec::new(); users],
            tiers: vec![HashMap::new(); users],
        }
    }

    pub fn user_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbors(&self, u: NodeId) -> &[NodeId] {
        &self.adjacency[u]
    }

    pub fn degree(&self, u: NodeId) -> usize {
        self.adjacency[u].len()
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.adjacency[u].contains(&v)
    }

    pub fn tier(&self, u: NodeId, v: NodeId) -> Option<Tier> {
        self.tiers[u].get(&v).copied()
    }

    /// Adds an edge with the given tier, reconciling with any existing tier
    /// (or prior direction) by keeping the stronger one on both sides.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, tier: Tier) {
        if u == v {
            return;
        }
        let resolved_u = match self.tiers[u].get(&v) {
            Some(&existing) => existing.stronger(tier),
            None => tier,
        };
        let resolved_v = match self.tiers[v].get(&u) {
            Some(&existing) => existing.stronger(resolved_u),
            None => resolved_u,
        };
        if !self.adjacency[u].contains(&v) {
            self.adjacency[u].push(v);
        }
        if !self.adjacency[v].contains(&u) {
            self.adjacency[v].push(u);
        }
        self.tiers[u].insert(v, resolved_v);
        self.tiers[v].insert(u, resolved_v);
    }

    /// Iterate every undirected edge exactly once, as a canonical pair.
    pub fn edges(&self) -> impl Iterator<Item = UnorderedPair> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(u, peers)| {
            peers
                .iter()
                .filter(move |&&v| v > u)
                .map(move |&v| UnorderedPair::new(u, v))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    pub fn degrees(&self) -> Vec<usize> {
        self.adjacency.iter().map(|a| a.len()).collect()
    }

    /// Verifies the symmetry invariant: `v in adj(u) <=> u in adj(v)`, and
    /// that both directions agree on the edge's tier.
    pub fn check_symmetry(&self) -> bool {
        for (u, peers) in self.adjacency.iter().enumerate() {
            for &v in peers {
                if !self.adjacency[v].contains(&u) {
                    return false;
                }
                if self.tier(u, v) != self.tier(v, u) {
                    return false;
                }
            }
        }
        true
    }
}
