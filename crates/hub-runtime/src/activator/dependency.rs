//! # Constructor Declarations
//!
//! Handlers describe how they are built instead of being discovered by
//! reflection. Each handler type implements [`Activate`] and lists one or
//! more [`Constructor`]s; every constructor names its parameters as
//! [`Dependency`] values, and its `build` function reads the resolved
//! arguments back in the same order.
//!
//! ```rust,ignore
//! struct TemperatureHandler {
//!     plc: Arc<PlcLink>,
//!     log: Logger<TemperatureHandler>,
//! }
//!
//! impl Activate for TemperatureHandler {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(
//!             vec![Dependency::connection::<PlcLink>(), Dependency::logger::<Self>()],
//!             |args| Ok(Self { plc: args.next()?, log: args.next()? }),
//!         )]
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use shared_types::type_key::short_type_name;
use shared_types::{Connection, Instance, Publisher, TypeKey};

use super::logger::Logger;
use super::{ActivationContext, HandlerActivator};
use crate::error::ActivationError;
use crate::registry::Hub;

/// One way of satisfying a dependency, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The hub itself.
    HubReference,
    /// The hub's connection of the requested concrete shape.
    HubConnection,
    /// The first connection exposing the publish capability.
    HubPublisher,
    /// The activator's backing resolver or resolver function.
    Backend,
    /// Recursive construction through the requested type's own constructors.
    LocalConstruction,
    /// A logger that discards everything.
    NoopLogger,
}

pub(crate) type ConstructFn =
    fn(&HandlerActivator, &mut ActivationContext<'_>) -> Result<Instance, ActivationError>;

#[derive(Clone, Copy)]
pub(crate) enum DependencyKind {
    Hub,
    Connection {
        shape: &'static str,
        find: fn(&Hub) -> Option<Instance>,
    },
    Publisher,
    Logger { fallback: fn() -> Instance },
    Service,
    Activated { construct: ConstructFn },
}

impl DependencyKind {
    fn strategies(&self) -> &'static [Strategy] {
        match self {
            Self::Hub => &[Strategy::HubReference],
            Self::Connection { .. } => &[Strategy::HubConnection],
            Self::Publisher => &[Strategy::HubPublisher],
            Self::Logger { .. } => &[Strategy::Backend, Strategy::NoopLogger],
            Self::Service => &[Strategy::Backend],
            Self::Activated { .. } => &[Strategy::Backend, Strategy::LocalConstruction],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Hub => "hub",
            Self::Connection { .. } => "connection",
            Self::Publisher => "publisher",
            Self::Logger { .. } => "logger",
            Self::Service => "service",
            Self::Activated { .. } => "activated",
        }
    }
}

/// A constructor parameter.
#[derive(Clone, Copy)]
pub struct Dependency {
    key: TypeKey,
    pub(crate) kind: DependencyKind,
}

impl Dependency {
    /// `Arc<Hub>`: the hub this activator belongs to.
    #[must_use]
    pub fn hub() -> Self {
        Self {
            key: TypeKey::of::<Arc<Hub>>(),
            kind: DependencyKind::Hub,
        }
    }

    /// `Arc<C>`: the hub's connection of concrete shape `C`.
    #[must_use]
    pub fn connection<C: Connection>() -> Self {
        Self {
            key: TypeKey::of::<Arc<C>>(),
            kind: DependencyKind::Connection {
                shape: std::any::type_name::<C>(),
                find: find_connection::<C>,
            },
        }
    }

    /// `Arc<dyn Publisher>`: the first connection that can publish.
    #[must_use]
    pub fn publisher() -> Self {
        Self {
            key: TypeKey::of::<Arc<dyn Publisher>>(),
            kind: DependencyKind::Publisher,
        }
    }

    /// `Logger<T>`: from the backing resolver, else a no-op logger.
    #[must_use]
    pub fn logger<T: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<Logger<T>>(),
            kind: DependencyKind::Logger {
                fallback: noop_logger::<T>,
            },
        }
    }

    /// `P`: anything the backing resolver can produce.
    #[must_use]
    pub fn service<P: 'static>() -> Self {
        Self {
            key: TypeKey::of::<P>(),
            kind: DependencyKind::Service,
        }
    }

    /// `Arc<T>`: from the backing resolver, else built through `T`'s
    /// own constructors.
    #[must_use]
    pub fn activated<T: Activate>() -> Self {
        Self {
            key: TypeKey::of::<Arc<T>>(),
            kind: DependencyKind::Activated {
                construct: construct_shared::<T>,
            },
        }
    }

    /// The parameter type this dependency resolves to.
    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Resolution strategies in the order they are tried.
    #[must_use]
    pub fn strategies(&self) -> &'static [Strategy] {
        self.kind.strategies()
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.label(), self.key)
    }
}

fn find_connection<C: Connection>(hub: &Hub) -> Option<Instance> {
    hub.find_connection::<C>().map(Instance::new)
}

fn noop_logger<T: ?Sized + 'static>() -> Instance {
    Instance::new(Logger::<T>::noop())
}

fn construct_shared<T: Activate>(
    activator: &HandlerActivator,
    ctx: &mut ActivationContext<'_>,
) -> Result<Instance, ActivationError> {
    activator
        .construct::<T>(ctx)
        .map(|built| Instance::new(Arc::new(built)))
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    handler: TypeKey,
    values: std::vec::IntoIter<Instance>,
}

impl Arguments {
    pub(crate) fn new(handler: TypeKey, values: Vec<Instance>) -> Self {
        Self {
            handler,
            values: values.into_iter(),
        }
    }

    /// Take the next argument as a `P`.
    pub fn next<P: Any + Clone>(&mut self) -> Result<P, ActivationError> {
        let expected = || short_type_name(std::any::type_name::<P>());

        let instance = self
            .values
            .next()
            .ok_or_else(|| ActivationError::ArgumentMismatch {
                handler: self.handler.short_name(),
                expected: expected(),
                found: "no further argument".to_string(),
            })?;

        instance
            .downcast::<P>()
            .ok_or_else(|| ActivationError::ArgumentMismatch {
                handler: self.handler.short_name(),
                expected: expected(),
                found: short_type_name(instance.type_name()),
            })
    }

    /// Arguments not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Build function for a constructor.
pub type BuildFn<T> = fn(&mut Arguments) -> Result<T, ActivationError>;

/// One way of building `T`.
pub struct Constructor<T> {
    params: Vec<Dependency>,
    build: BuildFn<T>,
}

impl<T> Constructor<T> {
    #[must_use]
    pub fn new(params: Vec<Dependency>, build: BuildFn<T>) -> Self {
        Self { params, build }
    }

    #[must_use]
    pub fn params(&self) -> &[Dependency] {
        &self.params
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn build(&self, args: &mut Arguments) -> Result<T, ActivationError> {
        (self.build)(args)
    }
}

impl<T: Default> Constructor<T> {
    /// Parameterless constructor through `Default`.
    #[must_use]
    pub fn from_default() -> Self {
        Self::new(Vec::new(), |_| Ok(T::default()))
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

/// A type the activator can build.
pub trait Activate: Send + Sync + Sized + 'static {
    /// Declared constructors. The one with the most parameters wins; ties go
    /// to the first declared. An empty list means the type cannot be
    /// activated.
    fn constructors() -> Vec<Constructor<Self>>;
}

/// Pick the constructor with the most parameters, first declared on ties.
pub(crate) fn select_constructor<T>(constructors: Vec<Constructor<T>>) -> Option<Constructor<T>> {
    let mut best: Option<Constructor<T>> = None;
    for candidate in constructors {
        match &best {
            Some(current) if current.arity() >= candidate.arity() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe(usize);

    #[test]
    fn test_select_most_parameters_first_on_tie() {
        let selected = select_constructor(vec![
            Constructor::<Probe>::new(vec![Dependency::hub()], |_| Ok(Probe(1))),
            Constructor::new(vec![Dependency::hub(), Dependency::publisher()], |_| Ok(Probe(2))),
            Constructor::new(vec![Dependency::publisher(), Dependency::hub()], |_| Ok(Probe(3))),
        ])
        .unwrap();

        let mut args = Arguments::new(TypeKey::of::<Probe>(), Vec::new());
        assert_eq!(selected.build(&mut args).unwrap().0, 2);
    }

    #[test]
    fn test_select_none_without_constructors() {
        assert!(select_constructor(Vec::<Constructor<Probe>>::new()).is_none());
        let default = select_constructor(vec![Constructor::<Probe>::from_default()]).unwrap();
        assert_eq!(default.arity(), 0);
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(Dependency::hub().strategies(), &[Strategy::HubReference]);
        assert_eq!(
            Dependency::logger::<Probe>().strategies(),
            &[Strategy::Backend, Strategy::NoopLogger]
        );
        assert_eq!(Dependency::service::<u32>().strategies(), &[Strategy::Backend]);
        assert!(Dependency::publisher().key().is::<Arc<dyn Publisher>>());
    }

    #[test]
    fn test_arguments_downcast_in_order() {
        let mut args = Arguments::new(
            TypeKey::of::<Probe>(),
            vec![Instance::new(5u32), Instance::new("plc".to_string())],
        );
        assert_eq!(args.next::<u32>().unwrap(), 5);
        assert_eq!(args.remaining(), 1);

        match args.next::<u32>() {
            Err(ActivationError::ArgumentMismatch { expected, found, .. }) => {
                assert_eq!(expected, "u32");
                assert_eq!(found, "String");
            }
            other => panic!("expected ArgumentMismatch, got {other:?}"),
        }

        assert!(matches!(
            args.next::<u32>(),
            Err(ActivationError::ArgumentMismatch { .. })
        ));
    }
}
