//! # Shared Types Crate
//!
//! This crate contains the vocabulary every Linkhub component agrees on:
//! connection capabilities, type identity for dependency resolution, and the
//! declarative subscription model.
//!
//! ## Design Principles
//!
//! - **Capabilities, not concrete drivers**: The hub only knows a connection
//!   through the `Connection`, `Lifecycle`, and `Publisher` traits.
//! - **Explicit type identity**: Dependency resolution is keyed by `TypeKey`
//!   (a `TypeId` plus its name for diagnostics), never by string matching.
//! - **Static subscriptions**: Descriptors are `const` data attached to
//!   handler types and are never mutated after declaration.

pub mod connection;
pub mod errors;
pub mod message;
pub mod subscription;
pub mod type_key;

pub use connection::{AsAny, Connection, Lifecycle, Publisher};
pub use errors::*;
pub use message::InboundMessage;
pub use subscription::{ChangeFilter, DataTypeHint, DeliveryMode, SubscriptionDescriptor};
pub use type_key::{Instance, TypeKey};

/// Re-exported so connection implementors share one cancellation primitive.
pub use tokio_util::sync::CancellationToken;
