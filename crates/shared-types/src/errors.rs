//! # Error Types
//!
//! Defines error types shared between the hub and protocol connections.

use thiserror::Error;

/// Errors a protocol connection reports from its lifecycle or publish calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// Transport-level failure (socket, TLS, DNS).
    #[error("I/O error: {0}")]
    Io(String),

    /// The peer answered with something the driver could not accept.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The operation did not complete in time.
    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// An operation that needs a live link was attempted while disconnected.
    #[error("Not connected")]
    NotConnected,

    /// The caller's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// The endpoint refused the request (authentication, ACL, bad address).
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Errors in subscription descriptors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubscriptionError {
    /// Deadband is negative, NaN, or infinite.
    #[error("Invalid deadband {deadband} for {address}")]
    InvalidDeadband { address: String, deadband: f64 },

    /// Deadband was set but change filtering is off.
    #[error("Deadband {deadband} on {address} has no effect without on-change filtering")]
    DeadbandWithoutChangeFilter { address: String, deadband: f64 },

    /// Polling interval was set on a push subscription.
    #[error("Polling interval {interval_ms}ms on unsolicited subscription {address}")]
    IntervalOnUnsolicited { address: String, interval_ms: u64 },

    /// Descriptor has an empty address.
    #[error("Subscription on connection '{connection}' has an empty address")]
    EmptyAddress { connection: String },

    /// Descriptor names a connection that is not configured.
    #[error("Subscription {address} references unknown connection '{connection}' (configured: {configured:?})")]
    UnknownConnection {
        connection: String,
        address: String,
        configured: Vec<String>,
    },
}
