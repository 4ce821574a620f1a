//! Outgoing message queue
//!
//! Holds messages composed while the connection is still `connecting`. The
//! queue is drained in FIFO order the instant the connection opens, and
//! discarded without flushing if the connection closes first.

use crate::core::message::ProtocolMessage;
use std::collections::VecDeque;

/// FIFO buffer for pending outbound messages
#[derive(Debug, Default)]
pub struct OutgoingQueue {
    pending: VecDeque<ProtocolMessage>,
}

impl OutgoingQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append a message to the back of the queue
    pub fn enqueue(&mut self, message: ProtocolMessage) {
        self.pending.push_back(message);
    }

    /// Take all pending messages in insertion order
    pub fn drain(&mut self) -> Vec<ProtocolMessage> {
        self.pending.drain(..).collect()
    }

    /// Drop all pending messages; returns how many were discarded
    pub fn discard(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
