//! # Hub Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HubEvent {
    // =========================================================================
    // CONNECTION LIFECYCLE
    // =========================================================================
    /// A connection finished `connect`.
    Connected { connection: String },

    /// A connection's `connect` failed.
    ConnectFailed { connection: String, reason: String },

    /// A connection finished `disconnect`.
    Disconnected { connection: String },

    /// A connection was released by the hub.
    Disposed { connection: String },

    // =========================================================================
    // DATA
    // =========================================================================
    /// A value was written through a connection's publish capability.
    Published { connection: String, address: String },

    // =========================================================================
    // APPLICATION
    // =========================================================================
    /// Application-defined notification.
    Custom {
        /// Free-form topic chosen by the application.
        topic: String,
        /// Who raised it (handler name, module, connection).
        source: String,
        /// Arbitrary payload.
        payload: serde_json::Value,
    },
}

impl HubEvent {
    /// Convenience constructor for application events.
    pub fn custom(
        topic: impl Into<String>,
        source: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::Custom {
            topic: topic.into(),
            source: source.into(),
            payload,
        }
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Connected { .. }
            | Self::ConnectFailed { .. }
            | Self::Disconnected { .. }
            | Self::Disposed { .. } => EventTopic::Lifecycle,
            Self::Published { .. } => EventTopic::Publish,
            Self::Custom { .. } => EventTopic::Application,
        }
    }

    /// Connection name or application source that raised the event.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Connected { connection }
            | Self::ConnectFailed { connection, .. }
            | Self::Disconnected { connection }
            | Self::Disposed { connection }
            | Self::Published { connection, .. } => connection,
            Self::Custom { source, .. } => source,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Connect, disconnect, dispose.
    Lifecycle,
    /// Outbound publishes.
    Publish,
    /// Application-defined events.
    Application,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Sources to include. Empty means all sources.
    pub sources: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            sources: Vec::new(),
        }
    }

    /// Create a filter for events raised by specific connections or sources.
    #[must_use]
    pub fn from_sources<S: Into<String>>(sources: impl IntoIterator<Item = S>) -> Self {
        Self {
            topics: Vec::new(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &HubEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match =
            self.sources.is_empty() || self.sources.iter().any(|s| s == event.source());

        topic_match && source_match
    }
}
