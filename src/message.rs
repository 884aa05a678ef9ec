//! Message records: the immutable unit logged for every successfully routed
//! send (spec.md section 3, "Message Record").

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};

pub type MessageId = u64;
pub type Epoch = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// The epoch at which the message was originated.
    pub t: Epoch,
    pub sender: NodeId,
    pub recipient: NodeId,
    pub id: MessageId,
    /// Node ids from `sender` to `recipient` inclusive, length <= Hmax+1.
    pub path: Vec<NodeId>,
    /// One hop per epoch, truncated at the simulation horizon.
    pub hop_times: Vec<Epoch>,
    pub dummy: bool,
    pub is_reply: bool,
}

impl MessageRecord {
    pub fn new(
        t: Epoch,
        id: MessageId,
        path: Vec<NodeId>,
        horizon: Epoch,
        dummy: bool,
        is_reply: bool,
    ) -> Self {
        debug_assert!(path.len() >= 2);
        let sender = path[0];
        let recipient = *path.last().unwrap();
        let hop_times = (0..path.len()).map(|i| (t + i).min(horizon)).collect();
        Self {
            t,
            sender,
            recipient,
            id,
            path,
            hop_times,
            dummy,
            is_reply,
        }
    }

    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}
