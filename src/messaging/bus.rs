/// Event bus
///
/// Broadcasts pipeline output to in-process consumers. Each subscriber owns
/// an unbounded channel; dropping the receiver is how a consumer leaves.
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use super::events::Event;

/// Fire-and-forget broadcast: no retry, no persistence.
///
/// Clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    senders: Arc<RwLock<Vec<Sender<Event>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        self.senders.write().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber and forget the ones whose
    /// receiver is gone. Returns the number of deliveries.
    pub fn publish(&self, event: Event) -> usize {
        let mut senders = self.senders.write();
        let before = senders.len();
        senders.retain(|tx| tx.send(event.clone()).is_ok());

        let closed = before - senders.len();
        if closed > 0 {
            tracing::debug!(
                "Dropped {} closed subscribers while publishing {}",
                closed,
                event.name()
            );
        }
        senders.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.read().len()
    }
}
