//! # Hub Telemetry
//!
//! Structured logging setup for processes that host a Linkhub hub.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hub_telemetry::{init_logging, TelemetryConfig};
//!
//! let _guard = init_logging(&TelemetryConfig::from_env())?;
//! tracing::info!("hub starting");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LINKHUB_SERVICE_NAME` | `linkhub` | Service name recorded in startup/shutdown logs |
//! | `LINKHUB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `LINKHUB_JSON_LOGS` | `false` | Emit JSON lines instead of human-readable output |
//! | `LINKHUB_ANSI` | `true` | Colorize human-readable output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Create an `info` span tagged with a connection name.
///
/// ```rust,ignore
/// let _span = hub_telemetry::hub_span!("connect", "plc").entered();
/// ```
#[macro_export]
macro_rules! hub_span {
    ($name:expr, $connection:expr) => {
        tracing::info_span!($name, connection = %$connection)
    };
    ($name:expr, $connection:expr, $($field:tt)*) => {
        tracing::info_span!($name, connection = %$connection, $($field)*)
    };
}
