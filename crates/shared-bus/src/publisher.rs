//! # Event Bus
//!
//! Sending side of the bus. `emit` never blocks and never fails: an event
//! nobody is listening for is dropped.

use crate::events::{EventFilter, HubEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// In-process broadcast bus for [`HubEvent`]s.
///
/// Every subscriber observes events in emission order.
#[derive(Debug)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<HubEvent>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// A capacity of 0 is raised to 1; `broadcast` cannot be empty.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Send `event` to every live subscription; returns how many received it.
    ///
    /// Filtering happens on the receiving side, so the count includes
    /// subscribers whose filter will discard the event.
    pub fn emit(&self, event: HubEvent) -> usize {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(topic = ?topic, receivers, "Event emitted");
                receivers
            }
            Err(_) => {
                trace!(topic = ?topic, "Event dropped (no receivers)");
                0
            }
        }
    }

    /// Only events emitted after this call are observed.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, sources = ?filter.sources, "Subscribed to hub events");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}
