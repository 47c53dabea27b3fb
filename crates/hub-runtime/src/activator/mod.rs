//! # Handler Activator
//!
//! Builds message handler instances on demand, auto-wiring constructor
//! parameters from the hub (the hub itself, a connection of a concrete
//! shape, the first publisher), from an optional backing resolver, or by
//! constructing the parameter type locally.
//!
//! ## Resolution order
//!
//! | Parameter              | Tried in order                             |
//! |------------------------|--------------------------------------------|
//! | `Arc<Hub>`             | hub back-reference                         |
//! | `Arc<C: Connection>`   | hub connection of shape `C`                |
//! | `Arc<dyn Publisher>`   | first publishing connection                |
//! | `Logger<T>`            | backing resolver, then a no-op logger      |
//! | service `P`            | backing resolver                           |
//! | `Arc<T: Activate>`     | backing resolver, then local construction  |
//!
//! Hub-backed strategies fail with a specific error rather than falling
//! through, so a missing connection is reported by shape.
//!
//! The hub back-reference is attached exactly once, when `HubBuilder::build`
//! finishes; until then hub-backed parameters fail with `NotInitialized`.

pub mod dependency;
pub mod logger;
pub mod resolver;
pub mod scope;

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use shared_types::{Instance, TypeKey};
use tracing::{debug, trace, warn};

use crate::error::ActivationError;
use crate::registry::Hub;

use dependency::{select_constructor, DependencyKind};
pub use dependency::{Activate, Arguments, BuildFn, Constructor, Dependency, Strategy};
pub use logger::Logger;
pub use resolver::{ResolveError, ResolverFn, ServiceMap, ServiceResolver, ServiceScope};
pub use scope::Scoped;

/// Default limit on nested local construction.
pub const DEFAULT_MAX_ACTIVATION_DEPTH: usize = 32;

/// What backs an activator beyond hub-provided parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivatorKind {
    /// Hub parameters, no-op loggers and local construction only.
    ConstructionOnly,
    /// A plain resolver function; scopes are no-ops.
    Function,
    /// A service resolver with scope support.
    Resolver,
}

/// Outcome of one resolution strategy.
enum Resolution {
    Resolved(Instance),
    Unresolved,
    Failed(ActivationError),
}

/// Where backend lookups go during one activation.
#[derive(Clone, Copy)]
enum Lookup<'a> {
    None,
    Root(&'a dyn ServiceResolver),
    Scope(&'a dyn ServiceScope),
}

/// State carried through one (possibly nested) activation.
pub(crate) struct ActivationContext<'a> {
    lookup: Lookup<'a>,
    path: Vec<TypeKey>,
}

impl<'a> ActivationContext<'a> {
    fn new(lookup: Lookup<'a>) -> Self {
        Self {
            lookup,
            path: Vec::new(),
        }
    }

    fn lookup(&self, key: &TypeKey) -> Option<Instance> {
        match self.lookup {
            Lookup::None => None,
            Lookup::Root(resolver) => resolver.resolve(key),
            Lookup::Scope(scope) => scope.resolve(key),
        }
    }

    fn enter(&mut self, handler: TypeKey, max_depth: usize) -> Result<(), ActivationError> {
        if self.path.contains(&handler) {
            let mut chain: Vec<String> = self.path.iter().map(TypeKey::short_name).collect();
            chain.push(handler.short_name());
            return Err(ActivationError::CircularDependency { chain });
        }
        if self.path.len() >= max_depth {
            return Err(ActivationError::ActivationDepthExceeded {
                handler: handler.short_name(),
                max_depth,
            });
        }
        self.path.push(handler);
        Ok(())
    }

    fn leave(&mut self) {
        self.path.pop();
    }
}

/// Constructs handlers with auto-wired dependencies.
pub struct HandlerActivator {
    kind: ActivatorKind,
    backend: Option<Arc<dyn ServiceResolver>>,
    hub: OnceLock<Weak<Hub>>,
    max_depth: usize,
}

impl HandlerActivator {
    /// Activator with no backing resolver.
    #[must_use]
    pub fn construction_only() -> Self {
        Self::with_backend(ActivatorKind::ConstructionOnly, None)
    }

    /// Activator backed by a resolver function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&TypeKey) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        Self::with_backend(ActivatorKind::Function, Some(Arc::new(ResolverFn::new(f))))
    }

    /// Activator backed by a service resolver.
    #[must_use]
    pub fn from_resolver(resolver: Arc<dyn ServiceResolver>) -> Self {
        Self::with_backend(ActivatorKind::Resolver, Some(resolver))
    }

    fn with_backend(kind: ActivatorKind, backend: Option<Arc<dyn ServiceResolver>>) -> Self {
        Self {
            kind,
            backend,
            hub: OnceLock::new(),
            max_depth: DEFAULT_MAX_ACTIVATION_DEPTH,
        }
    }

    /// Limit nested local construction. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    #[must_use]
    pub fn kind(&self) -> ActivatorKind {
        self.kind
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The backing service resolver, if this activator has one.
    ///
    /// Resolver functions are not exposed here.
    #[must_use]
    pub fn resolver(&self) -> Option<&Arc<dyn ServiceResolver>> {
        match self.kind {
            ActivatorKind::Resolver => self.backend.as_ref(),
            _ => None,
        }
    }

    /// The hub this activator belongs to, once built and while alive.
    #[must_use]
    pub fn hub(&self) -> Option<Arc<Hub>> {
        self.hub.get().and_then(Weak::upgrade)
    }

    /// Whether `attach` has run.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.hub.get().is_some()
    }

    /// Set the hub back-reference. Only the first call takes effect.
    pub(crate) fn attach(&self, hub: &Arc<Hub>) {
        if self.hub.set(Arc::downgrade(hub)).is_err() {
            warn!("Activator is already attached to a hub; keeping the first");
        }
    }

    /// Build `T`. A backing resolver that yields `Arc<T>` is used outright.
    pub fn create<T: Activate>(&self) -> Result<Arc<T>, ActivationError> {
        let lookup = match self.backend.as_deref() {
            Some(resolver) => Lookup::Root(resolver),
            None => Lookup::None,
        };
        self.activate::<T>(&mut ActivationContext::new(lookup))
    }

    /// Build `T` inside a fresh resolver scope.
    ///
    /// The returned handle releases the scope when disposed or dropped.
    /// Backends without scope support resolve from the root and the scope
    /// is a no-op.
    pub fn create_scoped<T: Activate>(&self) -> Result<Scoped<T>, ActivationError> {
        let scope = self.backend.as_ref().and_then(|backend| backend.create_scope());

        let built = {
            let lookup = match (&scope, self.backend.as_deref()) {
                (Some(scope), _) => Lookup::Scope(scope.as_ref()),
                (None, Some(resolver)) => Lookup::Root(resolver),
                (None, None) => Lookup::None,
            };
            self.activate::<T>(&mut ActivationContext::new(lookup))
        };

        match built {
            Ok(instance) => Ok(Scoped::new(instance, scope)),
            Err(e) => {
                if let Some(scope) = scope {
                    scope.dispose();
                }
                Err(e)
            }
        }
    }

    pub(crate) fn activate<T: Activate>(
        &self,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Arc<T>, ActivationError> {
        let shared = TypeKey::of::<Arc<T>>();

        if let Some(instance) = ctx.lookup(&shared) {
            match instance.downcast::<Arc<T>>() {
                Some(value) => {
                    debug!(handler = %TypeKey::of::<T>(), "Handler supplied by backing resolver");
                    return Ok(value);
                }
                None => warn!(
                    handler = %TypeKey::of::<T>(),
                    found = instance.type_name(),
                    "Backing resolver returned a different type; constructing locally"
                ),
            }
        }

        let built = self.construct::<T>(ctx)?;
        debug!(handler = %TypeKey::of::<T>(), "Handler activated");
        Ok(Arc::new(built))
    }

    /// Build `T` through its own constructors.
    pub(crate) fn construct<T: Activate>(
        &self,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<T, ActivationError> {
        let handler = TypeKey::of::<T>();
        ctx.enter(handler, self.max_depth)?;
        let result = self.construct_entered::<T>(handler, ctx);
        ctx.leave();
        result
    }

    fn construct_entered<T: Activate>(
        &self,
        handler: TypeKey,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<T, ActivationError> {
        let constructor = select_constructor(T::constructors()).ok_or_else(|| {
            ActivationError::NoPublicConstructor {
                handler: handler.short_name(),
            }
        })?;

        let mut values = Vec::with_capacity(constructor.arity());
        for dependency in constructor.params() {
            values.push(self.resolve(dependency, handler, ctx)?);
        }

        trace!(handler = %handler, arity = constructor.arity(), "Invoking constructor");
        constructor.build(&mut Arguments::new(handler, values))
    }

    fn resolve(
        &self,
        dependency: &Dependency,
        handler: TypeKey,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Instance, ActivationError> {
        for &strategy in dependency.strategies() {
            match self.apply(strategy, dependency, handler, ctx) {
                Resolution::Resolved(instance) => {
                    trace!(
                        handler = %handler,
                        parameter = %dependency.key(),
                        ?strategy,
                        "Parameter resolved"
                    );
                    return Ok(instance);
                }
                Resolution::Failed(e) => return Err(e),
                Resolution::Unresolved => {}
            }
        }

        Err(ActivationError::DependencyResolutionFailed {
            parameter: dependency.key().short_name(),
            handler: handler.short_name(),
        })
    }

    fn apply(
        &self,
        strategy: Strategy,
        dependency: &Dependency,
        handler: TypeKey,
        ctx: &mut ActivationContext<'_>,
    ) -> Resolution {
        match (strategy, dependency.kind) {
            (Strategy::HubReference, _) => match self.require_hub(dependency, handler) {
                Ok(hub) => Resolution::Resolved(Instance::new(hub)),
                Err(e) => Resolution::Failed(e),
            },
            (Strategy::HubConnection, DependencyKind::Connection { shape, find }) => {
                let hub = match self.require_hub(dependency, handler) {
                    Ok(hub) => hub,
                    Err(e) => return Resolution::Failed(e),
                };
                match find(&hub) {
                    Some(instance) => Resolution::Resolved(instance),
                    None => Resolution::Failed(ActivationError::ConnectionNotConfigured {
                        shape: shared_types::type_key::short_type_name(shape),
                        handler: handler.short_name(),
                        available: hub.configured_types(),
                    }),
                }
            }
            (Strategy::HubPublisher, _) => {
                let hub = match self.require_hub(dependency, handler) {
                    Ok(hub) => hub,
                    Err(e) => return Resolution::Failed(e),
                };
                match hub.publisher() {
                    Some((_, publisher)) => Resolution::Resolved(Instance::new(publisher)),
                    None => Resolution::Failed(ActivationError::PublisherNotAvailable {
                        shape: dependency.key().short_name(),
                        handler: handler.short_name(),
                    }),
                }
            }
            (Strategy::Backend, _) => match ctx.lookup(&dependency.key()) {
                Some(instance) => Resolution::Resolved(instance),
                None => Resolution::Unresolved,
            },
            (Strategy::LocalConstruction, DependencyKind::Activated { construct }) => {
                match construct(self, ctx) {
                    Ok(instance) => Resolution::Resolved(instance),
                    Err(e) => Resolution::Failed(e),
                }
            }
            (Strategy::NoopLogger, DependencyKind::Logger { fallback }) => {
                Resolution::Resolved(fallback())
            }
            _ => Resolution::Unresolved,
        }
    }

    fn require_hub(
        &self,
        dependency: &Dependency,
        handler: TypeKey,
    ) -> Result<Arc<Hub>, ActivationError> {
        self.hub().ok_or_else(|| ActivationError::NotInitialized {
            requested: dependency.key().short_name(),
            handler: handler.short_name(),
        })
    }
}

impl Default for HandlerActivator {
    fn default() -> Self {
        Self::construction_only()
    }
}

impl fmt::Debug for HandlerActivator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerActivator")
            .field("kind", &self.kind)
            .field("attached", &self.is_attached())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
