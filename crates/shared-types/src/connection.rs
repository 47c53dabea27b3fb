//! # Connection Capabilities
//!
//! Defines the contract a protocol connection implements to be hosted by the
//! hub. The hub never sees a concrete driver; it only asks each connection
//! which optional capabilities it exposes.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{CancellationToken, Connection, ConnectionError, Lifecycle};
//! use async_trait::async_trait;
//!
//! pub struct PlcLink { /* driver handle */ }
//!
//! #[async_trait]
//! impl Lifecycle for PlcLink {
//!     async fn connect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> { Ok(()) }
//!     async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> { Ok(()) }
//!     fn is_connected(&self) -> bool { true }
//! }
//!
//! #[async_trait]
//! impl Connection for PlcLink {
//!     fn name(&self) -> &str { "plc" }
//!     fn lifecycle(&self) -> Option<&dyn Lifecycle> { Some(self) }
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::ConnectionError;
use crate::type_key::short_type_name;

/// Upcast to `Any` for downcasting shared connections back to their concrete type.
///
/// Blanket-implemented for every `Send + Sync + 'static` type.
pub trait AsAny: Any + Send + Sync {
    /// Convert a shared handle into a shared `Any`.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Borrow as `Any`.
    ///
    /// Call through `&dyn Connection` (`conn.as_ref().as_any()`); on an
    /// `Arc` the blanket impl would erase the `Arc` itself.
    fn as_any(&self) -> &dyn Any;

    /// Concrete type name.
    fn concrete_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn concrete_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A long-lived link to an external protocol endpoint.
#[async_trait]
pub trait Connection: AsAny {
    /// Configured name; subscription descriptors refer to connections by it.
    fn name(&self) -> &str;

    /// Short name of the connection's shape, used in diagnostics.
    fn kind(&self) -> String {
        short_type_name(self.concrete_type_name())
    }

    /// Connect/disconnect capability. `None` means always ready.
    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }

    /// Publish capability, if the connection can send values outward.
    fn publisher(self: Arc<Self>) -> Option<Arc<dyn Publisher>> {
        None
    }

    /// Release driver resources. Called exactly once by the hub.
    async fn dispose(&self) -> Result<(), ConnectionError> {
        Ok(())
    }
}

/// Connect/disconnect capability.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Establish the link. Should return `ConnectionError::Cancelled` if
    /// `cancel` fires first.
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError>;

    /// Tear down the link.
    async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError>;

    /// Whether the link is currently up.
    fn is_connected(&self) -> bool;
}

/// Publish capability.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Write `value` to `address` on the remote endpoint.
    async fn publish(
        &self,
        address: &str,
        value: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<(), ConnectionError>;
}
