//! # Hub Builder
//!
//! Fluent configuration that produces a `Hub`:
//!
//! ```rust,ignore
//! let hub = HubBuilder::new()
//!     .with_service_resolver(Arc::new(services))
//!     .add_connection(|activator, _resolver| PlcLink::open("plc", "10.0.0.5", activator.clone()))
//!     .add_connection(|activator, resolver| BrokerLink::from_resolver("broker", resolver))
//!     .build()?;
//! ```
//!
//! Connection factories run in registration order at `build()` time, after
//! the activator has been settled, so every factory sees the same activator.

use std::fmt;
use std::sync::Arc;

use shared_types::{Connection, Instance, TypeKey};
use tracing::{debug, error, info, warn};

use crate::activator::{HandlerActivator, ResolveError, ServiceResolver};
use crate::config::HubConfig;
use crate::error::{BoxError, BuildError};
use crate::mediator::EventMediator;
use crate::registry::Hub;

type ConnectionFactory = Box<
    dyn FnOnce(
            &Arc<HandlerActivator>,
            Option<&Arc<dyn ServiceResolver>>,
        ) -> Result<Arc<dyn Connection>, BoxError>
        + Send,
>;

/// How the activator will be produced at build time.
enum ActivatorSource {
    ConstructionOnly,
    Resolver(Arc<dyn ServiceResolver>),
    Function(HandlerActivator),
    Custom(HandlerActivator),
}

impl ActivatorSource {
    fn label(&self) -> &'static str {
        match self {
            Self::ConstructionOnly => "construction-only",
            Self::Resolver(_) => "service resolver",
            Self::Function(_) => "resolver function",
            Self::Custom(_) => "custom",
        }
    }
}

/// Fluent hub configuration.
pub struct HubBuilder {
    factories: Vec<ConnectionFactory>,
    activator: ActivatorSource,
    config: HubConfig,
}

impl HubBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
            activator: ActivatorSource::ConstructionOnly,
            config: HubConfig::default(),
        }
    }

    /// Replace the hub configuration.
    #[must_use]
    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Skip registering the built hub with the global `EventMediator`.
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.config.register_global = false;
        self
    }

    /// Back the activator with a service resolver.
    ///
    /// This and the other `with_*` activator settings overwrite each
    /// other; the last call wins.
    #[must_use]
    pub fn with_service_resolver(mut self, resolver: Arc<dyn ServiceResolver>) -> Self {
        self.replace_activator(ActivatorSource::Resolver(resolver));
        self
    }

    /// Back the activator with a resolver function.
    #[must_use]
    pub fn with_resolver_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&TypeKey) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        self.replace_activator(ActivatorSource::Function(HandlerActivator::from_fn(f)));
        self
    }

    /// Use a fully configured activator as-is.
    #[must_use]
    pub fn with_activator(mut self, activator: HandlerActivator) -> Self {
        self.replace_activator(ActivatorSource::Custom(activator));
        self
    }

    fn replace_activator(&mut self, next: ActivatorSource) {
        if !matches!(self.activator, ActivatorSource::ConstructionOnly) {
            debug!(
                previous = self.activator.label(),
                next = next.label(),
                "Activator setting overridden"
            );
        }
        self.activator = next;
    }

    /// Queue a connection factory.
    ///
    /// The factory receives the final activator and, when the activator is
    /// backed by a service resolver, that resolver.
    #[must_use]
    pub fn add_connection<C, E, F>(mut self, factory: F) -> Self
    where
        C: Connection,
        E: Into<BoxError>,
        F: FnOnce(&Arc<HandlerActivator>, Option<&Arc<dyn ServiceResolver>>) -> Result<C, E>
            + Send
            + 'static,
    {
        self.factories.push(Box::new(move |activator, resolver| {
            factory(activator, resolver)
                .map(|conn| Arc::new(conn) as Arc<dyn Connection>)
                .map_err(Into::into)
        }));
        self
    }

    /// Register an already constructed connection.
    #[must_use]
    pub fn add_connection_instance<C: Connection>(mut self, connection: Arc<C>) -> Self {
        self.factories
            .push(Box::new(move |_, _| Ok(connection as Arc<dyn Connection>)));
        self
    }

    /// Number of queued connection factories.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.factories.len()
    }

    /// Settle the activator, run every factory in order, assemble the hub,
    /// attach it to the activator and, unless detached, register it with
    /// the `EventMediator`.
    ///
    /// A failing factory aborts the build; nothing is registered globally.
    pub fn build(self) -> Result<Arc<Hub>, BuildError> {
        self.config.validate()?;

        let depth = self.config.max_activation_depth;
        let activator = Arc::new(match self.activator {
            ActivatorSource::ConstructionOnly => {
                HandlerActivator::construction_only().with_max_depth(depth)
            }
            ActivatorSource::Resolver(resolver) => {
                HandlerActivator::from_resolver(resolver).with_max_depth(depth)
            }
            ActivatorSource::Function(activator) => activator.with_max_depth(depth),
            ActivatorSource::Custom(activator) => activator,
        });
        let resolver = activator.resolver().cloned();

        let mut connections: Vec<Arc<dyn Connection>> = Vec::with_capacity(self.factories.len());
        for (index, factory) in self.factories.into_iter().enumerate() {
            let connection = factory(&activator, resolver.as_ref()).map_err(|source| {
                error!("[Builder] Connection factory #{} failed: {}", index, source);
                BuildError::ConnectionFactory { index, source }
            })?;

            if connections.iter().any(|c| c.name() == connection.name()) {
                warn!(
                    connection = %connection.name(),
                    "Duplicate connection name; subscriptions will bind to the first"
                );
            }
            info!("[Builder] Registered {} ({})", connection.name(), connection.kind());
            connections.push(connection);
        }

        let register_global = self.config.register_global;
        let hub = Arc::new(Hub::new(connections, Arc::clone(&activator), self.config));
        activator.attach(&hub);

        if register_global {
            EventMediator::set_global(&hub);
        }

        info!(
            connections = hub.len(),
            activator = ?activator.kind(),
            global = register_global,
            "[Builder] Hub built"
        );
        Ok(hub)
    }
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HubBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubBuilder")
            .field("connections", &self.factories.len())
            .field("activator", &self.activator.label())
            .field("config", &self.config)
            .finish()
    }
}
