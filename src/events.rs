//! Outbound notification queue for completed operations.
//!
//! Completion notifications are pushed onto an explicit channel that
//! downstream consumers (indexers, auditors) drain at their own pace, rather
//! than being delivered through in-process callbacks. Events fire on success
//! only and stay queued until consumed, giving at-least-once delivery within
//! the process lifetime.

use crate::stablecoin::types::{
    BurnReceipt, BurnRequest, MintReceipt, MintRequest, SettlementBatch,
};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

#[derive(Debug, Clone)]
pub enum ChainEvent {
    MintCompleted { request: MintRequest, receipt: MintReceipt },
    BurnCompleted { request: BurnRequest, receipt: BurnReceipt },
    SettlementCompleted { batch: SettlementBatch },
}

#[derive(Clone)]
pub struct EventBus {
    sender: Sender<ChainEvent>,
    receiver: Receiver<ChainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn publish(&self, event: ChainEvent) {
        // the bus holds a receiver, so the channel can never be disconnected
        let _ = self.sender.send(event);
    }

    /// Handle for a consumer. Receivers share the queue: each event is
    /// delivered to exactly one of them.
    pub fn subscribe(&self) -> Receiver<ChainEvent> {
        self.receiver.clone()
    }

    /// Non-blocking pop, for poll-style consumers and tests.
    pub fn try_next(&self) -> Option<ChainEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
