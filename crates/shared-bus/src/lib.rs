//! # Shared Bus - Hub Event Broadcast
//!
//! Carries cross-cutting events (connection lifecycle, publishes, and
//! application-defined notifications) to any number of observers without
//! them holding a reference to the hub.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │     Hub      │                    │   Observer   │
//! │ connect_all()│     emit()         │  (any code)  │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Events are best-effort: publishing with no subscribers drops the event,
//! and a subscriber that falls behind by more than the channel capacity
//! skips the oldest events.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, HubEvent};
pub use publisher::InMemoryEventBus;
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are skipped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
