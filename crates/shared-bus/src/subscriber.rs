//! # Event Subscriber
//!
//! Receiving side of the event bus. A `Subscription` filters on the
//! receiver side, so every subscriber sees the same ordered event sequence
//! minus whatever its filter rejects.

use crate::events::{EventFilter, HubEvent};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// No matching event arrived in time.
    #[error("No event within {0:?}")]
    Timeout(Duration),
}

/// Receiving handle; dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<HubEvent>,
    filter: EventFilter,
    /// Events skipped because this subscriber fell behind.
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<HubEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<HubEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.lagged += count;
                    warn!(lagged = count, "Subscriber lagged, some events dropped");
                }
            }
        }
    }

    /// Receive the next matching event, giving up after `limit`.
    pub async fn recv_timeout(&mut self, limit: Duration) -> Result<HubEvent, SubscriptionError> {
        match tokio::time::timeout(limit, self.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(SubscriptionError::Closed),
            Err(_) => Err(SubscriptionError::Timeout(limit)),
        }
    }

    /// Try to receive the next matching event without waiting.
    ///
    /// `Ok(None)` means nothing is queued right now.
    pub fn try_recv(&mut self) -> Result<Option<HubEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => self.lagged += count,
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Total events this subscriber missed by lagging.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Convert into a `Stream` of matching events.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream::new(self)
    }
}

type FilteredEvents = Pin<Box<dyn Stream<Item = HubEvent> + Send>>;

/// A `Stream` of events matching a subscription's filter.
///
/// Lagged gaps are skipped; the stream ends when the bus is dropped.
pub struct EventStream {
    filter: EventFilter,
    inner: FilteredEvents,
}

impl EventStream {
    /// Create a new event stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let filter = subscription.filter.clone();
        let inner = futures::stream::unfold(subscription, |mut sub| async move {
            let event = sub.recv().await?;
            Some((event, sub))
        });

        Self {
            filter,
            inner: Box::pin(inner),
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = HubEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
