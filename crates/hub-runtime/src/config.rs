//! # Hub Configuration
//!
//! Runtime parameters for the hub. All values have sane defaults and can be
//! overridden from `LINKHUB_*` environment variables.

use crate::error::ConfigError;

/// Hub runtime parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Register the built hub with the process-wide `EventMediator`.
    pub register_global: bool,
    /// Maximum nesting of locally constructed dependencies.
    pub max_activation_depth: usize,
    /// Buffered hub events per subscriber.
    pub event_capacity: usize,
    /// Polling period for descriptors that leave it at 0.
    pub default_polling_interval_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            register_global: true,
            max_activation_depth: crate::activator::DEFAULT_MAX_ACTIVATION_DEPTH,
            event_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            default_polling_interval_ms: 1000,
        }
    }
}

impl HubConfig {
    /// Load from environment variables.
    ///
    /// - `LINKHUB_REGISTER_GLOBAL` (`1`/`true`/`yes`/`on`)
    /// - `LINKHUB_MAX_ACTIVATION_DEPTH`
    /// - `LINKHUB_EVENT_CAPACITY`
    /// - `LINKHUB_DEFAULT_POLLING_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("LINKHUB_REGISTER_GLOBAL") {
            config.register_global = matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(val) = lookup("LINKHUB_MAX_ACTIVATION_DEPTH") {
            config.max_activation_depth = parse("LINKHUB_MAX_ACTIVATION_DEPTH", &val)?;
        }
        if let Some(val) = lookup("LINKHUB_EVENT_CAPACITY") {
            config.event_capacity = parse("LINKHUB_EVENT_CAPACITY", &val)?;
        }
        if let Some(val) = lookup("LINKHUB_DEFAULT_POLLING_MS") {
            config.default_polling_interval_ms = parse("LINKHUB_DEFAULT_POLLING_MS", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests: no global registration.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            register_global: false,
            ..Self::default()
        }
    }

    /// Check limits are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_activation_depth == 0 {
            return Err(ConfigError::Zero {
                field: "max_activation_depth",
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Zero {
                field: "event_capacity",
            });
        }
        if self.default_polling_interval_ms == 0 {
            return Err(ConfigError::Zero {
                field: "default_polling_interval_ms",
            });
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}
