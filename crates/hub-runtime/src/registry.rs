//! # Connection Registry
//!
//! The `Hub` owns an ordered set of protocol connections and drives their
//! combined lifecycle:
//!
//! - `connect_all` walks connections in registration order and stops at the
//!   first failure (fail-fast)
//! - `disconnect_all` and `dispose` visit every connection and report the
//!   first error afterwards (best-effort)
//! - `dispose` runs at most once; later calls are no-ops
//!
//! Every lifecycle transition is also emitted on the hub's event bus.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hub_telemetry::hub_span;
use shared_bus::{EventFilter, HubEvent, InMemoryEventBus, Subscription};
use shared_types::type_key::short_type_name;
use shared_types::{CancellationToken, Connection, ConnectionError, Publisher};
use tracing::{debug, error, info, warn, Instrument};

use crate::activator::HandlerActivator;
use crate::config::HubConfig;
use crate::error::HubError;
use crate::handler::{ResolvedSubscription, Subscribe};

/// Observed state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No lifecycle capability; usable at any time.
    AlwaysReady,
    Connected,
    Disconnected,
}

/// Snapshot row returned by `Hub::status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub name: String,
    pub kind: String,
    pub state: ConnectionState,
}

/// Registry of configured connections.
pub struct Hub {
    /// Connections in registration order.
    connections: Vec<Arc<dyn Connection>>,
    /// Activator whose hub back-reference points here.
    activator: Arc<HandlerActivator>,
    /// Lifecycle and application events.
    events: Arc<InMemoryEventBus>,
    config: HubConfig,
    disposed: AtomicBool,
}

impl Hub {
    pub(crate) fn new(
        connections: Vec<Arc<dyn Connection>>,
        activator: Arc<HandlerActivator>,
        config: HubConfig,
    ) -> Self {
        Self {
            connections,
            activator,
            events: Arc::new(InMemoryEventBus::with_capacity(config.event_capacity)),
            config,
            disposed: AtomicBool::new(false),
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// The connection whose concrete shape is `T`.
    ///
    /// Returns the same instance on every call. When several connections
    /// share a shape, the first registered wins.
    pub fn connection<T: Connection>(&self) -> Result<Arc<T>, HubError> {
        self.find_connection::<T>()
            .ok_or_else(|| HubError::ConnectionTypeNotConfigured {
                requested: short_type_name(std::any::type_name::<T>()),
                configured: self.configured_types(),
            })
    }

    /// Like `connection`, without the diagnostic error.
    #[must_use]
    pub fn find_connection<T: Connection>(&self) -> Option<Arc<T>> {
        self.connections
            .iter()
            .find_map(|conn| Arc::clone(conn).into_any_arc().downcast::<T>().ok())
    }

    /// The connection registered under `name`.
    #[must_use]
    pub fn connection_named(&self, name: &str) -> Option<&Arc<dyn Connection>> {
        self.connections.iter().find(|conn| conn.name() == name)
    }

    /// All connections in registration order.
    #[must_use]
    pub fn connections(&self) -> &[Arc<dyn Connection>] {
        &self.connections
    }

    #[must_use]
    pub fn connection_names(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|conn| conn.name().to_string())
            .collect()
    }

    /// `"name (Kind)"` for each connection, for diagnostics.
    #[must_use]
    pub fn configured_types(&self) -> Vec<String> {
        self.connections
            .iter()
            .map(|conn| format!("{} ({})", conn.name(), conn.kind()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// The first connection exposing the publish capability.
    #[must_use]
    pub fn publisher(&self) -> Option<(String, Arc<dyn Publisher>)> {
        self.connections.iter().find_map(|conn| {
            let name = conn.name().to_string();
            Arc::clone(conn).publisher().map(|publisher| (name, publisher))
        })
    }

    #[must_use]
    pub fn activator(&self) -> &Arc<HandlerActivator> {
        &self.activator
    }

    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// The hub's event bus.
    #[must_use]
    pub fn events(&self) -> &Arc<InMemoryEventBus> {
        &self.events
    }

    /// Subscribe to hub events.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.events.subscribe(filter)
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Connect every connection that has a lifecycle, in registration order.
    ///
    /// Stops at the first failure; later connections are not attempted.
    /// Cancellation is checked before each connection and reported as
    /// `HubError::Cancelled`, distinct from a connection failure.
    pub async fn connect_all(&self, cancel: &CancellationToken) -> Result<(), HubError> {
        self.ensure_live()?;
        let mut completed = 0;

        for conn in &self.connections {
            if cancel.is_cancelled() {
                warn!("[Hub] connect_all cancelled after {} connection(s)", completed);
                return Err(HubError::Cancelled {
                    operation: "connect_all",
                    completed,
                });
            }

            let Some(lifecycle) = conn.lifecycle() else {
                debug!(connection = %conn.name(), "No lifecycle; always ready");
                completed += 1;
                continue;
            };

            info!("[Hub] Connecting {} ({})", conn.name(), conn.kind());
            match lifecycle
                .connect(cancel)
                .instrument(hub_span!("connect", conn.name()))
                .await
            {
                Ok(()) => {
                    self.events.emit(HubEvent::Connected {
                        connection: conn.name().to_string(),
                    });
                    completed += 1;
                }
                Err(e) if matches!(e, ConnectionError::Cancelled) || cancel.is_cancelled() => {
                    warn!(connection = %conn.name(), "Connect cancelled");
                    return Err(HubError::Cancelled {
                        operation: "connect_all",
                        completed,
                    });
                }
                Err(e) => {
                    error!("[Hub] Failed to connect {}: {}", conn.name(), e);
                    self.events.emit(HubEvent::ConnectFailed {
                        connection: conn.name().to_string(),
                        reason: e.to_string(),
                    });
                    return Err(HubError::ConnectFailed {
                        connection: conn.name().to_string(),
                        source: e,
                    });
                }
            }
        }

        info!("[Hub] All {} connection(s) ready", completed);
        Ok(())
    }

    /// Disconnect every connection that has a lifecycle.
    ///
    /// Keeps going after a failure and returns the first error. Once
    /// `cancel` fires no further connections are stopped, and a connection
    /// interrupted by it is reported as `Cancelled` rather than a failure.
    pub async fn disconnect_all(&self, cancel: &CancellationToken) -> Result<(), HubError> {
        self.ensure_live()?;
        let mut first_error = None;
        let mut completed = 0;

        for conn in &self.connections {
            if cancel.is_cancelled() {
                warn!("[Hub] disconnect_all cancelled after {} connection(s)", completed);
                return Err(HubError::Cancelled {
                    operation: "disconnect_all",
                    completed,
                });
            }

            let Some(lifecycle) = conn.lifecycle() else {
                completed += 1;
                continue;
            };

            info!("[Hub] Disconnecting {}", conn.name());
            match lifecycle
                .disconnect(cancel)
                .instrument(hub_span!("disconnect", conn.name()))
                .await
            {
                Ok(()) => {
                    self.events.emit(HubEvent::Disconnected {
                        connection: conn.name().to_string(),
                    });
                }
                Err(e) if matches!(e, ConnectionError::Cancelled) || cancel.is_cancelled() => {
                    warn!(connection = %conn.name(), "Disconnect cancelled");
                    return Err(HubError::Cancelled {
                        operation: "disconnect_all",
                        completed,
                    });
                }
                Err(e) => {
                    error!("[Hub] Failed to disconnect {}: {}", conn.name(), e);
                    first_error.get_or_insert(HubError::DisconnectFailed {
                        connection: conn.name().to_string(),
                        source: e,
                    });
                }
            }
            completed += 1;
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Release every connection exactly once.
    ///
    /// Idempotent: only the first call does any work. Connections that never
    /// connected are released too. Returns the first release error after
    /// all connections were visited.
    pub async fn dispose(&self) -> Result<(), HubError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            debug!("Hub already disposed");
            return Ok(());
        }

        let mut first_error = None;
        for conn in &self.connections {
            match conn
                .dispose()
                .instrument(hub_span!("dispose", conn.name()))
                .await
            {
                Ok(()) => debug!(connection = %conn.name(), "Connection released"),
                Err(e) => {
                    error!("[Hub] Failed to release {}: {}", conn.name(), e);
                    first_error.get_or_insert(HubError::DisposeFailed {
                        connection: conn.name().to_string(),
                        source: e,
                    });
                }
            }
            self.events.emit(HubEvent::Disposed {
                connection: conn.name().to_string(),
            });
        }

        info!("[Hub] Disposed {} connection(s)", self.connections.len());
        first_error.map_or(Ok(()), Err)
    }

    fn ensure_live(&self) -> Result<(), HubError> {
        if self.is_disposed() {
            return Err(HubError::Disposed);
        }
        Ok(())
    }

    // =========================================================================
    // DATA
    // =========================================================================

    /// Write `value` to `address` through the first publishing connection.
    pub async fn publish(
        &self,
        address: &str,
        value: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<(), HubError> {
        self.ensure_live()?;

        let (connection, publisher) =
            self.publisher()
                .ok_or_else(|| HubError::PublisherNotAvailable {
                    configured: self.configured_types(),
                })?;

        publisher
            .publish(address, value, cancel)
            .await
            .map_err(|source| HubError::PublishFailed {
                connection: connection.clone(),
                address: address.to_string(),
                source,
            })?;

        self.events.emit(HubEvent::Published {
            connection,
            address: address.to_string(),
        });
        Ok(())
    }

    /// Validate `H`'s declared subscriptions against the configured
    /// connections and pair each with its connection.
    pub fn subscriptions_for<H: Subscribe>(&self) -> Result<Vec<ResolvedSubscription>, HubError> {
        let names = self.connection_names();

        H::SUBSCRIPTIONS
            .iter()
            .map(|descriptor| -> Result<ResolvedSubscription, HubError> {
                descriptor.validate_against(&names)?;
                let connection = self
                    .connection_named(descriptor.connection_name)
                    .map(Arc::clone)
                    .ok_or_else(|| HubError::ConnectionTypeNotConfigured {
                        requested: descriptor.connection_name.to_string(),
                        configured: self.configured_types(),
                    })?;
                Ok(ResolvedSubscription {
                    descriptor: *descriptor,
                    polling_interval_ms: descriptor
                        .effective_polling_interval(self.config.default_polling_interval_ms),
                    connection,
                })
            })
            .collect()
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    /// Per-connection state snapshot.
    #[must_use]
    pub fn status(&self) -> Vec<ConnectionStatus> {
        self.connections
            .iter()
            .map(|conn| ConnectionStatus {
                name: conn.name().to_string(),
                kind: conn.kind(),
                state: match conn.lifecycle() {
                    None => ConnectionState::AlwaysReady,
                    Some(lifecycle) if lifecycle.is_connected() => ConnectionState::Connected,
                    Some(_) => ConnectionState::Disconnected,
                },
            })
            .collect()
    }

    /// Whether every connection is usable right now.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !self.is_disposed()
            && self
                .status()
                .iter()
                .all(|row| row.state != ConnectionState::Disconnected)
    }

    /// Log a status table.
    pub fn print_status(&self) {
        info!("===========================================");
        info!("  HUB CONNECTION STATUS");
        info!("===========================================");
        for row in self.status() {
            let icon = match row.state {
                ConnectionState::Connected => "✅",
                ConnectionState::AlwaysReady => "➖",
                ConnectionState::Disconnected => "⏹️ ",
            };
            info!("  {} {:24} {:16} {:?}", icon, row.name, row.kind, row.state);
        }
        info!("===========================================");
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        if !self.is_disposed() && !self.connections.is_empty() {
            warn!(
                connections = self.connections.len(),
                "Hub dropped without dispose(); connection resources were not released"
            );
        }
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("connections", &self.configured_types())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
