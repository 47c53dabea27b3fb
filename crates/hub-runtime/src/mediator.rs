//! # Event Mediator
//!
//! Process-wide access to the most recently built hub, for code that has no
//! hub reference of its own (static callbacks, driver threads).
//!
//! The mediator holds only a weak reference: it never keeps a hub alive.
//! Building another hub replaces the reference (last write wins).

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use shared_bus::{EventFilter, HubEvent, Subscription};
use shared_types::{CancellationToken, Connection};
use tracing::{debug, info};

use crate::activator::Activate;
use crate::error::MediatorError;
use crate::registry::Hub;

static GLOBAL_HUB: RwLock<Option<Weak<Hub>>> = parking_lot::const_rwlock(None);

/// Static facade over the process-wide hub reference.
pub struct EventMediator;

impl EventMediator {
    /// Point the mediator at `hub`, replacing any previous hub.
    pub fn set_global(hub: &Arc<Hub>) {
        let replaced = GLOBAL_HUB.write().replace(Arc::downgrade(hub)).is_some();
        info!(replaced, connections = hub.len(), "Event mediator hub set");
    }

    /// Forget the current hub.
    pub fn reset() {
        if GLOBAL_HUB.write().take().is_some() {
            debug!("Event mediator reset");
        }
    }

    /// Whether a hub has been set (it may since have been dropped).
    #[must_use]
    pub fn is_initialized() -> bool {
        GLOBAL_HUB.read().is_some()
    }

    /// The current hub.
    pub fn hub() -> Result<Arc<Hub>, MediatorError> {
        let guard = GLOBAL_HUB.read();
        let weak = guard.as_ref().ok_or(MediatorError::MediatorNotInitialized)?;
        weak.upgrade().ok_or(MediatorError::HubReleased)
    }

    /// The current hub's connection of shape `T`.
    pub fn connection<T: Connection>() -> Result<Arc<T>, MediatorError> {
        Ok(Self::hub()?.connection::<T>()?)
    }

    /// Build `T` with the current hub's activator.
    pub fn create<T: Activate>() -> Result<Arc<T>, MediatorError> {
        Ok(Self::hub()?.activator().create::<T>()?)
    }

    /// Publish through the current hub's first publishing connection.
    pub async fn publish(
        address: &str,
        value: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let hub = Self::hub()?;
        hub.publish(address, value, cancel).await?;
        Ok(())
    }

    /// Raise an event on the current hub's bus.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish_event(event: HubEvent) -> Result<usize, MediatorError> {
        Ok(Self::hub()?.events().emit(event))
    }

    /// Subscribe to the current hub's events.
    pub fn subscribe(filter: EventFilter) -> Result<Subscription, MediatorError> {
        Ok(Self::hub()?.subscribe(filter))
    }
}
