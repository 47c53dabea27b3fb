//! Scoped activation result.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::resolver::ServiceScope;

/// A handler built inside its own resolver scope.
///
/// Disposing (or dropping) it releases the scope and every scoped service the
/// handler received. For backends without scope support this is a no-op.
pub struct Scoped<T> {
    instance: Arc<T>,
    scope: Option<Arc<dyn ServiceScope>>,
}

impl<T> Scoped<T> {
    pub(crate) fn new(instance: Arc<T>, scope: Option<Arc<dyn ServiceScope>>) -> Self {
        Self { instance, scope }
    }

    #[must_use]
    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    /// Whether a real resolver scope backs this handler.
    #[must_use]
    pub fn has_scope(&self) -> bool {
        self.scope.is_some()
    }

    /// Release the scope now.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.dispose();
        }
    }
}

impl<T> Deref for Scoped<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T> Drop for Scoped<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for Scoped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped")
            .field("type", &std::any::type_name::<T>())
            .field("has_scope", &self.has_scope())
            .finish()
    }
}
