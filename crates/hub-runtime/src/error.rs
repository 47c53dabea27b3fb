//! # Error Types
//!
//! Configuration errors (missing connection shape, missing constructor) are
//! developer-facing startup errors, so they name the concrete shape and list
//! what *is* configured.

use shared_types::{ConnectionError, SubscriptionError};
use thiserror::Error;

/// Boxed error returned by connection factories and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while constructing a handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActivationError {
    /// The hub was requested before `build()` completed (or after it was dropped).
    #[error("Hub not initialized: {requested} requested by {handler} before build() completed")]
    NotInitialized { requested: String, handler: String },

    /// A specific connection shape was requested but none is registered.
    #[error("Connection {shape} required by {handler} is not configured (available: {available:?})")]
    ConnectionNotConfigured {
        shape: String,
        handler: String,
        available: Vec<String>,
    },

    /// A publisher was requested but no connection can publish.
    #[error("No connection exposes a publisher for {shape} required by {handler}")]
    PublisherNotAvailable { shape: String, handler: String },

    /// A parameter could not be resolved by any strategy.
    #[error("Cannot resolve parameter {parameter} of {handler}")]
    DependencyResolutionFailed { parameter: String, handler: String },

    /// The handler type declares no constructor.
    #[error("{handler} declares no public constructor")]
    NoPublicConstructor { handler: String },

    /// A constructor read an argument of a different type than it declared.
    #[error("Constructor of {handler} expected {expected} but received {found}")]
    ArgumentMismatch {
        handler: String,
        expected: String,
        found: String,
    },

    /// Local construction looped back to a type already being built.
    #[error("Circular dependency: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// Local construction nested deeper than the configured limit.
    #[error("Activation of {handler} exceeded maximum depth {max_depth}")]
    ActivationDepthExceeded { handler: String, max_depth: usize },
}

/// Errors from hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// `connection::<T>()` found no connection of shape `T`.
    #[error("Connection type {requested} is not configured (configured: {configured:?})")]
    ConnectionTypeNotConfigured {
        requested: String,
        configured: Vec<String>,
    },

    #[error("Connect failed for '{connection}': {source}")]
    ConnectFailed {
        connection: String,
        #[source]
        source: ConnectionError,
    },

    #[error("Disconnect failed for '{connection}': {source}")]
    DisconnectFailed {
        connection: String,
        #[source]
        source: ConnectionError,
    },

    #[error("Dispose failed for '{connection}': {source}")]
    DisposeFailed {
        connection: String,
        #[source]
        source: ConnectionError,
    },

    #[error("Publish to {address} via '{connection}' failed: {source}")]
    PublishFailed {
        connection: String,
        address: String,
        #[source]
        source: ConnectionError,
    },

    /// No configured connection exposes the publish capability.
    #[error("No connection can publish (configured: {configured:?})")]
    PublisherNotAvailable { configured: Vec<String> },

    /// The operation observed its cancellation token.
    #[error("{operation} cancelled after {completed} connection(s)")]
    Cancelled {
        operation: &'static str,
        completed: usize,
    },

    /// The hub has already been disposed.
    #[error("Hub has been disposed")]
    Disposed,

    /// A handler returned an error while processing a message.
    #[error("Handler {handler} failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

impl HubError {
    /// Name of the connection the error is attributed to, if any.
    #[must_use]
    pub fn connection(&self) -> Option<&str> {
        match self {
            Self::ConnectFailed { connection, .. }
            | Self::DisconnectFailed { connection, .. }
            | Self::DisposeFailed { connection, .. }
            | Self::PublishFailed { connection, .. } => Some(connection),
            _ => None,
        }
    }

    /// Whether this error reports cancellation rather than failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors from `HubBuilder::build`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid hub configuration: {0}")]
    Config(#[from] ConfigError),

    /// A connection factory failed; no hub was built and nothing was
    /// registered globally.
    #[error("Connection factory #{index} failed: {source}")]
    ConnectionFactory {
        index: usize,
        #[source]
        source: BoxError,
    },
}

/// Errors from the process-wide event mediator.
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("Event mediator not initialized: no hub has been built")]
    MediatorNotInitialized,

    /// The registered hub has since been dropped.
    #[error("The hub registered with the event mediator has been released")]
    HubReleased,

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

/// Hub configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
