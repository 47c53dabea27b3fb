//! Typed logger handed to handlers as a constructor dependency.

use std::fmt;
use std::marker::PhantomData;

use shared_types::type_key::short_type_name;

/// A `tracing`-backed logger categorized by `T`.
///
/// When no resolver supplies one, handlers receive `Logger::noop()`, which
/// accepts every call and emits nothing.
pub struct Logger<T: ?Sized> {
    category: &'static str,
    enabled: bool,
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> Logger<T> {
    /// A logger that emits through `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            category: std::any::type_name::<T>(),
            enabled: true,
            _marker: PhantomData,
        }
    }

    /// A logger that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Short category name (`T` without module path).
    #[must_use]
    pub fn category(&self) -> String {
        short_type_name(self.category)
    }

    pub fn debug(&self, message: &str) {
        if self.enabled {
            tracing::debug!(category = self.category, "{message}");
        }
    }

    pub fn info(&self, message: &str) {
        if self.enabled {
            tracing::info!(category = self.category, "{message}");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.enabled {
            tracing::warn!(category = self.category, "{message}");
        }
    }

    pub fn error(&self, message: &str) {
        if self.enabled {
            tracing::error!(category = self.category, "{message}");
        }
    }
}

impl<T: ?Sized + 'static> Default for Logger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Logger<T> {
    fn clone(&self) -> Self {
        Self {
            category: self.category,
            enabled: self.enabled,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Logger<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .field("enabled", &self.enabled)
            .finish()
    }
}
