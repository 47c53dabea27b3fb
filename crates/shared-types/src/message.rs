//! Inbound message envelope delivered from a connection to a handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value received on a connection for one subscribed address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Name of the connection that received the value.
    pub connection: String,
    /// Protocol address (tag, topic, register) the value came from.
    pub address: String,
    /// Decoded payload.
    pub value: serde_json::Value,
    /// When the connection received the value.
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message stamped with the current time.
    pub fn new(
        connection: impl Into<String>,
        address: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            connection: connection.into(),
            address: address.into(),
            value,
            received_at: Utc::now(),
        }
    }
}
