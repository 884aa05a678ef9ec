//! C6: Conversation & Reply Scheduler.
//!
//! Reply queue entries are bucketed by sub-epoch up front (see
//! [`crate::user`]'s module doc) rather than modeled as per-user callbacks,
//! so the orchestrator's "process replies due this sub-epoch" step is a
//! single `Vec` drain instead of a scan over every user.

use crate::graph::{NodeId, SocialGraph, Tier, UnorderedPair};
use crate::message::Epoch;
use crate::rng::DeterministicRng;
use std::collections::HashMap;

const MAX_THREAD_LEN: u32 = 5;
const THREAD_INACTIVITY_CUTOFF: Epoch = 10;
const SUB_EPOCHS_PER_HOUR: usize = 6;

fn tier_multiplier(tier: Tier) -> f64 {
    match tier {
        Tier::Intimate => 1.5,
        Tier::Friend => 1.0,
        Tier::Acquaintance => 0.6,
    }
}

#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub participants: UnorderedPair,
    pub message_count: u32,
    pub last_active: Epoch,
}

impl ConversationThread {
    fn new(participants: UnorderedPair, t: Epoch) -> Self {
        Self {
            participants,
            message_count: 0,
            last_active: t,
        }
    }

    fn alive(&self, t: Epoch) -> bool {
        self.message_count < MAX_THREAD_LEN && t.saturating_sub(self.last_active) <= THREAD_INACTIVITY_CUTOFF
    }

    fn continuation_probability(&self) -> f64 {
        0.7f64.powi(self.message_count as i32)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingReply {
    from: NodeId,
    to: NodeId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationStats {
    pub thread_count: usize,
    pub mean_messages_per_thread: f64,
}

pub struct ReplyScheduler {
    threads: HashMap<UnorderedPair, ConversationThread>,
    schedule: Vec<Vec<PendingReply>>,
}

impl ReplyScheduler {
    pub fn new(total_sub_epochs: usize) -> Self {
        Self {
            threads: HashMap::new(),
            schedule: vec![Vec::new(); total_sub_epochs],
        }
    }

    /// After a successful send `sender -> recipient` at epoch `t`, decide
    /// whether `recipient` will reply, and if so, schedule it.
    pub fn maybe_schedule_reply(
        &mut self,
        graph: &SocialGraph,
        sender: NodeId,
        recipient: NodeId,
        t: Epoch,
        rng: &mut DeterministicRng,
    ) {
        if let Some(tier) = graph.tier(recipient, sender) {
            self.schedule_candidate(recipient, sender, tier_multiplier(tier), t, rng);
        }
    }

    fn schedule_candidate(
        &mut self,
        from: NodeId,
        to: NodeId,
        m: f64,
        t: Epoch,
        rng: &mut DeterministicRng,
    ) {
        let w_instant = 0.25 * m;
        let w_delayed = 0.60 * m;
        let w_eventual = 0.10 * m;
        let w_none = 0.05;
        let total = w_instant + w_delayed + w_eventual + w_none;
        let r = rng.next_f64() * total;
        let mut acc = 0.0;

        acc += w_instant;
        if r < acc {
            self.enqueue(from, to, t, rng);
            return;
        }
        acc += w_delayed;
        if r < acc {
            let epoch = t + 1 + rng.next_below(5);
            self.enqueue(from, to, epoch, rng);
            return;
        }
        acc += w_eventual;
        if r < acc {
            let epoch = t + 5 + rng.next_below(15);
            self.enqueue(from, to, epoch, rng);
        }
        // else: "none" -- no reply scheduled.
    }

    fn enqueue(&mut self, from: NodeId, to: NodeId, epoch: Epoch, rng: &mut DeterministicRng) {
        let raw = epoch * SUB_EPOCHS_PER_HOUR + rng.next_below(SUB_EPOCHS_PER_HOUR);
        let sub_epoch = raw.min(self.schedule.len().saturating_sub(1));
        self.schedule[sub_epoch].push(PendingReply { from, to });
    }

    /// Drains the sub-epoch's pending replies, running each through its
    /// conversation thread's continuation check, and returns the
    /// `(from, to)` pairs that actually get sent this sub-epoch. Emitted
    /// replies also schedule a same-rules counter-reply in the opposite
    /// direction.
    pub fn process_sub_epoch(
        &mut self,
        graph: &SocialGraph,
        se: usize,
        t: Epoch,
        rng: &mut DeterministicRng,
    ) -> Vec<(NodeId, NodeId)> {
        let pending = std::mem::take(&mut self.schedule[se]);
        let mut emitted = Vec::new();
        for PendingReply { from, to } in pending {
            let pair = UnorderedPair::new(from, to);
            let should_continue = {
                let thread = self
                    .threads
                    .entry(pair)
                    .or_insert_with(|| ConversationThread::new(pair, t));
                thread.alive(t) && rng.next_bool(thread.continuation_probability())
            };
            if !should_continue {
                continue;
            }
            {
                let thread = self.threads.get_mut(&pair).unwrap();
                thread.message_count += 1;
                thread.last_active = t;
            }
            emitted.push((from, to));

            if let Some(tier) = graph.tier(to, from) {
                self.schedule_candidate(to, from, tier_multiplier(tier), t, rng);
            }
        }
        emitted
    }

    pub fn stats(&self) -> ConversationStats {
        let thread_count = self.threads.len();
        if thread_count == 0 {
            return ConversationStats::default();
        }
        let total_messages: u32 = self.threads.values().map(|th| th.message_count).sum();
        ConversationStats {
            thread_count,
            mean_messages_per_thread: total_messages as f64 / thread_count as f64,
        }
    }
}
