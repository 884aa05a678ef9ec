//! Per-user simulation state (spec.md section 3, "User").
//!
//! The reply queue itself lives bucketed by sub-epoch in
//! [`crate::conversation::ReplyScheduler`] rather than as a per-user `Vec`
//! that the orchestrator would have to scan every sub-epoch (see spec.md
//! Design Notes, "Replies as scheduled events, not callbacks" -- bucketing
//! is the form that note explicitly allows).

use crate::graph::NodeId;
use crate::message::Epoch;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct User {
    pub id: NodeId,
    /// Peer -> last epoch a message (real or dummy) was exchanged with them.
    pub last_contact: HashMap<NodeId, Epoch>,
}

impl User {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            last_contact: HashMap::new(),
        }
    }

    pub fn note_contact(&mut self, peer: NodeId, epoch: Epoch) {
        self.last_contact
            .entry(peer)
            .and_modify(|e| *e = (*e).max(epoch))
            .or_insert(epoch);
    }
}

pub fn new_population(n: usize) -> Vec<User> {
    (0..n).map(User::new).collect()
}
