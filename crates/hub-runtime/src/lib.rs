//! # Hub Runtime
//!
//! Hosts several long-lived protocol connections as one unit and builds
//! message handlers with their dependencies wired in automatically.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  build()   ┌──────────────────────────────────────┐
//! │  HubBuilder  │ ─────────→ │                 Hub                  │
//! │  factories   │            │  connections (registration order)    │
//! └──────────────┘            │  connect_all / disconnect_all        │
//!        │                    │  dispose (once)                      │
//!        │ set_global         └──────────────────────────────────────┘
//!        ▼                         ↑ weak                 │ Arc
//! ┌──────────────┐                 │                      ▼
//! │EventMediator │ ────────────────┘            ┌──────────────────┐
//! │ (weak, last  │                              │ HandlerActivator │
//! │  write wins) │                              │ hub ─ weak ──────┼──→ Hub
//! └──────────────┘                              │ backend resolver │
//!                                               └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let hub = HubBuilder::new()
//!     .add_connection(|activator, _| PlcLink::open("plc", activator.clone()))
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! hub.connect_all(&cancel).await?;
//! hub.activator()
//!     .dispatch::<TemperatureHandler>(InboundMessage::new("plc", "DB1.DBD0", json!(21.5)))
//!     .await?;
//! hub.dispose().await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod activator;
pub mod builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod mediator;
pub mod registry;

pub use activator::{
    Activate, ActivatorKind, Arguments, Constructor, Dependency, HandlerActivator, Logger, ResolveError,
    ResolverFn, Scoped, ServiceMap, ServiceResolver, ServiceScope, Strategy,
};
pub use builder::HubBuilder;
pub use config::HubConfig;
pub use error::{ActivationError, BoxError, BuildError, ConfigError, HubError, MediatorError};
pub use handler::{MessageHandler, ResolvedSubscription, Subscribe};
pub use mediator::EventMediator;
pub use registry::{ConnectionState, ConnectionStatus, Hub};

pub use shared_bus::{EventFilter, EventTopic, HubEvent};
pub use shared_types::{
    CancellationToken, ChangeFilter, Connection, ConnectionError, DataTypeHint, DeliveryMode,
    InboundMessage, Instance, Lifecycle, Publisher, SubscriptionDescriptor, SubscriptionError,
    TypeKey,
};
