//! C10: Evaluator.
//!
//! A pure read-only pass over a finished experiment: the message log, the
//! ground-truth graph, and the adversary's accumulated guesses and graph
//! estimate. Nothing here feeds back into the simulation -- this is the
//! "test-only channel" spec.md's Design Notes calls out explicitly:
//! production inference never sees the full log, only what `noteSend` /
//! `noteContact` exposed as the run went along.

use crate::adversary::{AdversaryEngine, EstimatedTier};
use crate::conversation::ConversationStats;
use crate::graph::{NodeId, SocialGraph, Tier, UnorderedPair};
use crate::message::MessageRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub correct: u64,
    pub total: u64,
}

impl AccuracyMetrics {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PrecisionRecallF1 {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl PrecisionRecallF1 {
    fn from_counts(tp: u64, fp: u64, fn_: u64) -> Self {
        let precision = if tp + fp == 0 { 0.0 } else { tp as f64 / (tp + fp) as f64 };
        let recall = if tp + fn_ == 0 { 0.0 } else { tp as f64 / (tp + fn_) as f64 };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self { precision, recall, f1 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphReconstructionMetrics {
    pub edges: PrecisionRecallF1,
    pub per_tier: HashMap<String, PrecisionRecallF1>,
    /// `(true tier label or "none", estimated tier label or "none") -> count`.
    pub confusion: HashMap<String, u64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CoverTrafficMetrics {
    pub dummy_fraction: f64,
    pub dummy_sender_entropy: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RoutingMetrics {
    pub avg_path_length: f64,
    pub diversity: f64,
    pub short_path_fraction: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConversationMetrics {
    pub reply_count: u64,
    pub mean_reply_delay: f64,
    pub thread_count: usize,
    pub mean_messages_per_thread: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: AccuracyMetrics,
    pub graph_reconstruction: GraphReconstructionMetrics,
    pub cover_traffic: CoverTrafficMetrics,
    pub routing: RoutingMetrics,
    pub conversation: ConversationMetrics,
}

pub fn evaluate(
    log: &[MessageRecord],
    graph: &SocialGraph,
    adversary: &AdversaryEngine,
    conversation_stats: ConversationStats,
) -> EvaluationReport {
    EvaluationReport {
        accuracy: accuracy(log, adversary),
        graph_reconstruction: graph_reconstruction(graph, adversary),
        cover_traffic: cover_traffic(log),
        routing: routing(log),
        conversation: conversation(log, conversation_stats),
    }
}

fn accuracy(log: &[MessageRecord], adversary: &AdversaryEngine) -> AccuracyMetrics {
    let mut truth: HashMap<(usize, NodeId), HashMap<NodeId, u32>> = HashMap::new();
    for m in log {
        *truth.entry((m.t, m.sender)).or_default().entry(m.recipient).or_insert(0) += 1;
    }

    let mut metrics = AccuracyMetrics::default();
    for guess in adversary.guesses() {
        let Some(candidates) = truth.get(&(guess.t, guess.sender)) else {
            continue;
        };
        let majority = candidates.iter().max_by_key(|&(_, &count)| count).map(|(&v, _)| v);
        metrics.total += 1;
        if majority == Some(guess.guess) {
            metrics.correct += 1;
        }
    }
    metrics
}

fn tier_label(tier: Tier) -> &'static str {
    tier.as_str()
}

fn estimated_tier_label(tier: EstimatedTier) -> &'static str {
    match tier {
        EstimatedTier::Intimate => "intimate",
        EstimatedTier::Friend => "friend",
        EstimatedTier::Acquaintance => "acquaintance",
        EstimatedTier::Weak => "weak",
    }
}

fn estimated_tier_equivalent(tier: EstimatedTier) -> Option<Tier> {
    match tier {
        EstimatedTier::Intimate => Some(Tier::Intimate),
        EstimatedTier::Friend => Some(Tier::Friend),
        EstimatedTier::Acquaintance => Some(Tier::Acquaintance),
        EstimatedTier::Weak => None,
    }
}

fn graph_reconstruction(graph: &SocialGraph, adversary: &AdversaryEngine) -> GraphReconstructionMetrics {
    let true_edges: HashMap<UnorderedPair, Tier> =
        graph.edges().map(|pair| (pair, graph.tier(pair.0, pair.1).unwrap())).collect();
    let estimated: HashMap<UnorderedPair, EstimatedTier> =
        adversary.estimated_edges().map(|(pair, tier, _)| (pair, tier)).collect();

    let tp = true_edges.keys().filter(|p| estimated.contains_key(p)).count() as u64;
    let fp = estimated.keys().filter(|p| !true_edges.contains_key(p)).count() as u64;
    let fn_ = true_edges.keys().filter(|p| !estimated.contains_key(p)).count() as u64;
    let edges = PrecisionRecallF1::from_counts(tp, fp, fn_);

    let mut per_tier = HashMap::new();
    let mut confusion: HashMap<String, u64> = HashMap::new();
    for tier in [Tier::Intimate, Tier::Friend, Tier::Acquaintance] {
        let mut ttp = 0u64;
        let mut tfp = 0u64;
        let mut tfn = 0u64;
        for (pair, &true_tier) in &true_edges {
            let matches = estimated.get(pair).and_then(|&et| estimated_tier_equivalent(et)) == Some(tier);
            if true_tier == tier && matches {
                ttp += 1;
            } else if true_tier == tier && !matches {
                tfn += 1;
            }
        }
        for (pair, &est_tier) in &estimated {
            if estimated_tier_equivalent(est_tier) != Some(tier) {
                continue;
            }
            let true_matches = true_edges.get(pair) == Some(&tier);
            if !true_matches {
                tfp += 1;
            }
        }
        per_tier.insert(tier_label(tier).to_string(), PrecisionRecallF1::from_counts(ttp, tfp, tfn));
    }

    let all_pairs: std::collections::HashSet<UnorderedPair> =
        true_edges.keys().chain(estimated.keys()).copied().collect();
    for pair in all_pairs {
        let true_label = true_edges.get(&pair).map(|t| tier_label(*t)).unwrap_or("none");
        let est_label = estimated.get(&pair).map(|t| estimated_tier_label(*t)).unwrap_or("none");
        *confusion.entry(format!("{true_label}->{est_label}")).or_insert(0) += 1;
    }

    GraphReconstructionMetrics { edges, per_tier, confusion }
}

fn cover_traffic(log: &[MessageRecord]) -> CoverTrafficMetrics {
    let total = log.len() as u64;
    let dummies: Vec<&MessageRecord> = log.iter().filter(|m| m.dummy).collect();
    let dummy_fraction = if total == 0 { 0.0 } else { dummies.len() as f64 / total as f64 };

    let mut by_sender: HashMap<NodeId, u64> = HashMap::new();
    for m in &dummies {
        *by_sender.entry(m.sender).or_insert(0) += 1;
    }
    let dummy_total = dummies.len() as f64;
    let dummy_sender_entropy = if dummy_total == 0.0 {
        0.0
    } else {
        -by_sender
            .values()
            .map(|&c| {
                let p = c as f64 / dummy_total;
                p * p.log2()
            })
            .sum::<f64>()
    };

    CoverTrafficMetrics { dummy_fraction, dummy_sender_entropy }
}

fn routing(log: &[MessageRecord]) -> RoutingMetrics {
    let routed: Vec<&MessageRecord> = log.iter().filter(|m| !m.dummy).collect();
    if routed.is_empty() {
        return RoutingMetrics::default();
    }
    let total = routed.len() as f64;
    let avg_path_length = routed.iter().map(|m| m.path.len() as f64).sum::<f64>() / total;
    let unique: std::collections::HashSet<&Vec<NodeId>> = routed.iter().map(|m| &m.path).collect();
    let diversity = unique.len() as f64 / total;
    let short = routed.iter().filter(|m| m.path.len() <= 3).count() as f64;
    RoutingMetrics {
        avg_path_length,
        diversity,
        short_path_fraction: short / total,
    }
}

fn conversation(log: &[MessageRecord], stats: ConversationStats) -> ConversationMetrics {
    let mut by_pair: HashMap<UnorderedPair, Vec<&MessageRecord>> = HashMap::new();
    for m in log {
        by_pair.entry(UnorderedPair::new(m.sender, m.recipient)).or_default().push(m);
    }
    let mut reply_count = 0u64;
    let mut total_delay = 0u64;
    for msgs in by_pair.values_mut() {
        msgs.sort_by_key(|m| m.t);
        for w in msgs.windows(2) {
            if w[1].is_reply {
                reply_count += 1;
                total_delay += w[1].t.saturating_sub(w[0].t) as u64;
            }
        }
    }
    let mean_reply_delay = if reply_count == 0 {
        0.0
    } else {
        total_delay as f64 / reply_count as f64
    };

    ConversationMetrics {
        reply_count,
        mean_reply_delay,
        thread_count: stats.thread_count,
        mean_messages_per_thread: stats.mean_messages_per_thread,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adversary::AdversaryEngine;
    use crate::graph::Tier;

    fn msg(t: usize, sender: NodeId, recipient: NodeId, dummy: bool, is_reply: bool) -> MessageRecord {
        MessageRecord::new(t, t as u64, vec![sender, recipient], 1000, dummy, is_reply)
    }

    #[test]
    fn accuracy_is_zero_with_no_guesses() {
        let log = vec![msg(0, 0, 1, false, false)];
        let adversary = AdversaryEngine::new(Default::default());
        let metrics = accuracy(&log, &adversary);
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.rate(), 0.0);
    }

    #[test]
    fn dummy_fraction_zero_when_cover_disabled() {
        let log = vec![msg(0, 0, 1, false, false), msg(1, 1, 2, false, false)];
        let metrics = cover_traffic(&log);
        assert_eq!(metrics.dummy_fraction, 0.0);
    }

    #[test]
    fn graph_metrics_perfect_when_estimate_matches_truth() {
        let mut g = SocialGraph::empty(2);
        g.add_edge(0, 1, Tier::Friend);
        let mut adversary = AdversaryEngine::new([0, 1].into_iter().collect());
        for t in 0..40 {
            adversary.note_contact(t, 0, 1, 5);
        }
        adversary.finalize();
        let metrics = graph_reconstruction(&g, &adversary);
        assert_eq!(metrics.edges.precision, 1.0);
        assert_eq!(metrics.edges.recall, 1.0);
    }
}
