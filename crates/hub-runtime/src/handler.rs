//! # Message Handlers
//!
//! A handler is an application type that processes values arriving on a
//! connection. Connections deliver an `InboundMessage`, and the activator
//! builds a fresh handler per message inside its own resolver scope.
//!
//! Handlers declare what they listen to through [`Subscribe`]:
//!
//! ```rust,ignore
//! impl Subscribe for TemperatureHandler {
//!     const SUBSCRIPTIONS: &'static [SubscriptionDescriptor] = &[
//!         SubscriptionDescriptor::polling("plc", "DB1.DBD0").every_ms(500).on_change(),
//!     ];
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use shared_types::type_key::short_type_name;
use shared_types::{Connection, InboundMessage, SubscriptionDescriptor};
use tracing::{debug, warn};

use crate::activator::{Activate, HandlerActivator};
use crate::error::HubError;

/// Processes one inbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> anyhow::Result<()>;
}

/// Static subscription declarations for a handler type.
pub trait Subscribe {
    const SUBSCRIPTIONS: &'static [SubscriptionDescriptor];
}

/// A validated descriptor paired with the connection it names.
#[derive(Clone)]
pub struct ResolvedSubscription {
    pub descriptor: SubscriptionDescriptor,
    /// Effective polling period; `None` for unsolicited delivery.
    pub polling_interval_ms: Option<u64>,
    pub connection: Arc<dyn Connection>,
}

impl fmt::Debug for ResolvedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSubscription")
            .field("connection", &self.connection.name())
            .field("address", &self.descriptor.address)
            .field("mode", &self.descriptor.delivery_mode)
            .field("polling_interval_ms", &self.polling_interval_ms)
            .finish()
    }
}

impl HandlerActivator {
    /// Activate a scoped `H`, hand it `message`, then release the scope.
    ///
    /// Activation runs synchronously before the handler is awaited.
    pub async fn dispatch<H>(&self, message: InboundMessage) -> Result<(), HubError>
    where
        H: MessageHandler + Activate,
    {
        let handler_name = short_type_name(std::any::type_name::<H>());
        let handler = self.create_scoped::<H>().map_err(|e| {
            warn!(handler = %handler_name, error = %e, "Handler activation failed");
            e
        })?;

        debug!(
            handler = %handler_name,
            connection = %message.connection,
            address = %message.address,
            "Dispatching message"
        );
        let outcome = handler.handle(message).await;
        handler.dispose();

        outcome.map_err(|source| HubError::Handler {
            handler: handler_name,
            source: source.into(),
        })
    }
}
