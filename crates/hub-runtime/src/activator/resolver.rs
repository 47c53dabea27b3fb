//! # Backing Resolvers
//!
//! A handler activator can be backed by nothing, by a plain resolver
//! function, or by a full service resolver that also supports scopes.
//! Lookups are keyed by the exact parameter type a constructor declares
//! (`TypeKey::of::<P>()`), and the returned `Instance` must wrap a `P`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::{Instance, TypeKey};
use thiserror::Error;
use tracing::{debug, trace};

/// A resolver function declined to produce a type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{key} is not registered: {reason}")]
pub struct ResolveError {
    pub key: TypeKey,
    pub reason: String,
}

impl ResolveError {
    /// The type is simply not known to this resolver.
    #[must_use]
    pub fn not_registered(key: &TypeKey) -> Self {
        Self {
            key: *key,
            reason: "no registration".to_string(),
        }
    }
}

/// Resolves instances by type.
pub trait ServiceResolver: Send + Sync {
    /// Produce an instance for `key`, or `None` if this resolver cannot.
    fn resolve(&self, key: &TypeKey) -> Option<Instance>;

    /// Open a child scope. Resolvers without scope support return `None`.
    fn create_scope(&self) -> Option<Arc<dyn ServiceScope>> {
        None
    }
}

/// A resolution scope whose instances live until `dispose`.
pub trait ServiceScope: ServiceResolver {
    /// Release everything the scope created. Must be idempotent.
    fn dispose(&self);
}

type ResolveFn = dyn Fn(&TypeKey) -> Result<Instance, ResolveError> + Send + Sync;

/// Function-backed resolver. Scopes are not supported.
pub struct ResolverFn {
    inner: Box<ResolveFn>,
}

impl ResolverFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TypeKey) -> Result<Instance, ResolveError> + Send + Sync + 'static,
    {
        Self { inner: Box::new(f) }
    }
}

impl ServiceResolver for ResolverFn {
    fn resolve(&self, key: &TypeKey) -> Option<Instance> {
        match (self.inner)(key) {
            Ok(instance) => Some(instance),
            Err(e) => {
                trace!(key = %key, reason = %e.reason, "Resolver function declined");
                None
            }
        }
    }
}

type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;

#[derive(Clone)]
enum Registration {
    Singleton(Instance),
    Transient(Factory),
    Scoped(Factory),
}

/// A small registration table usable as a service resolver.
///
/// - singletons are shared everywhere
/// - transients are created on every lookup
/// - scoped entries are created once per scope and dropped on dispose
///   (resolving a scoped entry outside any scope behaves like a transient)
#[derive(Clone, Default)]
pub struct ServiceMap {
    registrations: Arc<HashMap<TypeKey, Registration>>,
}

impl ServiceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared value.
    #[must_use]
    pub fn singleton<P: Send + Sync + 'static>(self, value: P) -> Self {
        self.insert::<P>(Registration::Singleton(Instance::new(value)))
    }

    /// Register a factory invoked on every lookup.
    #[must_use]
    pub fn transient<P, F>(self, factory: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.insert::<P>(Registration::Transient(Arc::new(move || Instance::new(factory()))))
    }

    /// Register a factory invoked once per scope.
    #[must_use]
    pub fn scoped<P, F>(self, factory: F) -> Self
    where
        P: Send + Sync + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.insert::<P>(Registration::Scoped(Arc::new(move || Instance::new(factory()))))
    }

    #[must_use]
    pub fn contains<P: ?Sized + 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeKey::of::<P>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn insert<P: 'static>(mut self, registration: Registration) -> Self {
        let key = TypeKey::of::<P>();
        if Arc::make_mut(&mut self.registrations)
            .insert(key, registration)
            .is_some()
        {
            debug!(key = %key, "Replaced existing registration");
        }
        self
    }
}

impl ServiceResolver for ServiceMap {
    fn resolve(&self, key: &TypeKey) -> Option<Instance> {
        match self.registrations.get(key)? {
            Registration::Singleton(instance) => Some(instance.clone()),
            Registration::Transient(factory) | Registration::Scoped(factory) => Some(factory()),
        }
    }

    fn create_scope(&self) -> Option<Arc<dyn ServiceScope>> {
        Some(Arc::new(MapScope {
            root: self.clone(),
            cache: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }))
    }
}

/// Scope opened from a `ServiceMap`.
struct MapScope {
    root: ServiceMap,
    cache: Mutex<HashMap<TypeKey, Instance>>,
    disposed: AtomicBool,
}

impl ServiceResolver for MapScope {
    fn resolve(&self, key: &TypeKey) -> Option<Instance> {
        match self.root.registrations.get(key)? {
            Registration::Scoped(factory) if !self.disposed.load(Ordering::Acquire) => Some(
                self.cache
                    .lock()
                    .entry(*key)
                    .or_insert_with(|| factory())
                    .clone(),
            ),
            _ => self.root.resolve(key),
        }
    }

    fn create_scope(&self) -> Option<Arc<dyn ServiceScope>> {
        self.root.create_scope()
    }
}

impl ServiceScope for MapScope {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let released = {
            let mut cache = self.cache.lock();
            let count = cache.len();
            cache.clear();
            count
        };
        trace!(released, "Service scope disposed");
    }
}
