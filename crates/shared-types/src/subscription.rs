//! # Subscription Descriptors
//!
//! Declarative metadata attached to a handler type that tells a protocol
//! connection which address to watch and how values should be delivered.
//!
//! Descriptors are built with `const fn`s so a handler can declare them as a
//! `&'static [SubscriptionDescriptor]`:
//!
//! ```rust
//! use shared_types::{DataTypeHint, SubscriptionDescriptor};
//!
//! const TEMPERATURE: &[SubscriptionDescriptor] = &[
//!     SubscriptionDescriptor::polling("plc", "DB1.DBD0")
//!         .every_ms(500)
//!         .on_change()
//!         .with_deadband(0.5)
//!         .typed(DataTypeHint::Real),
//!     SubscriptionDescriptor::unsolicited("broker", "plant/line1/alarm"),
//! ];
//! # assert_eq!(TEMPERATURE.len(), 2);
//! ```
//!
//! ## Invariants
//!
//! - `deadband` only matters when `on_change_only` is set.
//! - `polling_interval_ms` only matters for `DeliveryMode::Polling`;
//!   0 means "use the connection default".

use serde::{Deserialize, Serialize};

use crate::errors::SubscriptionError;

/// How values reach the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryMode {
    /// The connection reads the address on a timer.
    Polling,
    /// The endpoint pushes values (broker topic, PLC alarm, report-by-exception).
    Unsolicited,
}

/// Hint for decoding the raw payload at the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataTypeHint {
    /// Let the connection infer the type.
    #[default]
    Auto,
    Bool,
    Byte,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    Real,
    LReal,
    String,
    DateTime,
    /// User-defined structure decoded by the connection.
    Structure,
    /// Raw bytes passed through untouched.
    Raw,
}

/// Declarative subscription bound to a handler type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubscriptionDescriptor {
    /// Name of the connection to subscribe on.
    pub connection_name: &'static str,
    /// Protocol address (tag, topic, register).
    pub address: &'static str,
    /// Polling or push delivery.
    pub delivery_mode: DeliveryMode,
    /// Polling period; 0 uses the connection default.
    pub polling_interval_ms: u64,
    /// Deliver only when the value changed.
    pub on_change_only: bool,
    /// Minimum numeric change for change-filtered delivery.
    pub deadband: f64,
    /// Decoding hint.
    pub data_type_hint: DataTypeHint,
}

impl SubscriptionDescriptor {
    /// Polling subscription with connection-default cadence.
    #[must_use]
    pub const fn polling(connection_name: &'static str, address: &'static str) -> Self {
        Self {
            connection_name,
            address,
            delivery_mode: DeliveryMode::Polling,
            polling_interval_ms: 0,
            on_change_only: false,
            deadband: 0.0,
            data_type_hint: DataTypeHint::Auto,
        }
    }

    /// Push subscription.
    #[must_use]
    pub const fn unsolicited(connection_name: &'static str, address: &'static str) -> Self {
        Self {
            delivery_mode: DeliveryMode::Unsolicited,
            ..Self::polling(connection_name, address)
        }
    }

    /// Set the polling period.
    #[must_use]
    pub const fn every_ms(mut self, interval_ms: u64) -> Self {
        self.polling_interval_ms = interval_ms;
        self
    }

    /// Deliver only changed values.
    #[must_use]
    pub const fn on_change(mut self) -> Self {
        self.on_change_only = true;
        self
    }

    /// Set the minimum numeric change.
    #[must_use]
    pub const fn with_deadband(mut self, deadband: f64) -> Self {
        self.deadband = deadband;
        self
    }

    /// Set the decoding hint.
    #[must_use]
    pub const fn typed(mut self, hint: DataTypeHint) -> Self {
        self.data_type_hint = hint;
        self
    }

    /// Check the descriptor's internal consistency.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        if self.address.trim().is_empty() {
            return Err(SubscriptionError::EmptyAddress {
                connection: self.connection_name.to_string(),
            });
        }

        if !self.deadband.is_finite() || self.deadband < 0.0 {
            return Err(SubscriptionError::InvalidDeadband {
                address: self.address.to_string(),
                deadband: self.deadband,
            });
        }

        if self.deadband > 0.0 && !self.on_change_only {
            return Err(SubscriptionError::DeadbandWithoutChangeFilter {
                address: self.address.to_string(),
                deadband: self.deadband,
            });
        }

        if self.delivery_mode == DeliveryMode::Unsolicited && self.polling_interval_ms != 0 {
            return Err(SubscriptionError::IntervalOnUnsolicited {
                address: self.address.to_string(),
                interval_ms: self.polling_interval_ms,
            });
        }

        Ok(())
    }

    /// Check that the descriptor names one of `configured` connections.
    pub fn validate_against<S: AsRef<str>>(&self, configured: &[S]) -> Result<(), SubscriptionError> {
        self.validate()?;

        if configured.iter().any(|name| name.as_ref() == self.connection_name) {
            return Ok(());
        }

        Err(SubscriptionError::UnknownConnection {
            connection: self.connection_name.to_string(),
            address: self.address.to_string(),
            configured: configured.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }

    /// Polling period to use, or `None` for push delivery.
    #[must_use]
    pub fn effective_polling_interval(&self, connection_default_ms: u64) -> Option<u64> {
        match self.delivery_mode {
            DeliveryMode::Unsolicited => None,
            DeliveryMode::Polling if self.polling_interval_ms == 0 => Some(connection_default_ms),
            DeliveryMode::Polling => Some(self.polling_interval_ms),
        }
    }

    /// Deadband in effect, or `None` when change filtering is off.
    #[must_use]
    pub fn effective_deadband(&self) -> Option<f64> {
        self.on_change_only.then_some(self.deadband)
    }

    /// A fresh change filter for one subscription instance.
    #[must_use]
    pub fn change_filter(&self) -> ChangeFilter {
        ChangeFilter::new(self.on_change_only, self.deadband)
    }
}

/// Stateful change suppression for one subscribed address.
///
/// Connections use this to honor `on_change_only` and `deadband`. Numeric
/// values are compared against the last *delivered* value, so slow drift
/// still crosses the deadband eventually.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    enabled: bool,
    deadband: f64,
    last_delivered: Option<serde_json::Value>,
}

impl ChangeFilter {
    /// Create a filter. A disabled filter delivers everything.
    #[must_use]
    pub fn new(on_change_only: bool, deadband: f64) -> Self {
        Self {
            enabled: on_change_only,
            deadband: deadband.max(0.0),
            last_delivered: None,
        }
    }

    /// Decide whether `value` should be delivered, updating state if so.
    pub fn should_deliver(&mut self, value: &serde_json::Value) -> bool {
        if !self.enabled {
            return true;
        }

        let deliver = match (&self.last_delivered, value.as_f64()) {
            (None, _) => true,
            (Some(previous), Some(current)) => match previous.as_f64() {
                Some(prev) if self.deadband > 0.0 => (current - prev).abs() >= self.deadband,
                Some(prev) => current != prev,
                None => true,
            },
            (Some(previous), None) => previous != value,
        };

        if deliver {
            self.last_delivered = Some(value.clone());
        }
        deliver
    }

    /// Forget the last delivered value (e.g. after a reconnect).
    pub fn reset(&mut self) {
        self.last_delivered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DECLARED: &[SubscriptionDescriptor] = &[
        SubscriptionDescriptor::polling("plc", "DB1.DBD0")
            .every_ms(250)
            .on_change()
            .with_deadband(0.5)
            .typed(DataTypeHint::Real),
        SubscriptionDescriptor::unsolicited("broker", "line1/alarm"),
    ];

    #[test]
    fn test_const_declaration() {
        assert_eq!(DECLARED[0].delivery_mode, DeliveryMode::Polling);
        assert_eq!(DECLARED[0].polling_interval_ms, 250);
        assert_eq!(DECLARED[1].delivery_mode, DeliveryMode::Unsolicited);
        assert_eq!(DECLARED[1].data_type_hint, DataTypeHint::Auto);
        assert!(DECLARED.iter().all(|d| d.validate().is_ok()));
    }

    #[test]
    fn test_deadband_requires_change_filter() {
        let d = SubscriptionDescriptor::polling("plc", "DB1.DBD4").with_deadband(1.0);
        assert!(matches!(
            d.validate(),
            Err(SubscriptionError::DeadbandWithoutChangeFilter { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_and_nan_deadband() {
        let negative = SubscriptionDescriptor::polling("plc", "A").on_change().with_deadband(-1.0);
        let nan = SubscriptionDescriptor::polling("plc", "A").on_change().with_deadband(f64::NAN);
        assert!(matches!(negative.validate(), Err(SubscriptionError::InvalidDeadband { .. })));
        assert!(matches!(nan.validate(), Err(SubscriptionError::InvalidDeadband { .. })));
    }

    #[test]
    fn test_interval_on_unsolicited_rejected() {
        let d = SubscriptionDescriptor::unsolicited("broker", "t").every_ms(100);
        assert!(matches!(d.validate(), Err(SubscriptionError::IntervalOnUnsolicited { .. })));
    }

    #[test]
    fn test_validate_against_configured_names() {
        let configured = ["plc", "historian"];
        assert!(DECLARED[0].validate_against(&configured).is_ok());

        match DECLARED[1].validate_against(&configured) {
            Err(SubscriptionError::UnknownConnection { connection, configured, .. }) => {
                assert_eq!(connection, "broker");
                assert_eq!(configured, vec!["plc".to_string(), "historian".to_string()]);
            }
            other => panic!("expected UnknownConnection, got {other:?}"),
        }
    }

    #[test]
    fn test_effective_values() {
        let default_cadence = SubscriptionDescriptor::polling("plc", "A");
        assert_eq!(default_cadence.effective_polling_interval(1000), Some(1000));
        assert_eq!(DECLARED[0].effective_polling_interval(1000), Some(250));
        assert_eq!(DECLARED[1].effective_polling_interval(1000), None);

        assert_eq!(DECLARED[0].effective_deadband(), Some(0.5));
        assert_eq!(default_cadence.effective_deadband(), None);
    }

    #[test]
    fn test_change_filter_deadband() {
        let mut filter = DECLARED[0].change_filter();
        assert!(filter.should_deliver(&json!(20.0)));
        assert!(!filter.should_deliver(&json!(20.3)));
        assert!(!filter.should_deliver(&json!(20.4)));
        assert!(filter.should_deliver(&json!(20.5)));
        assert!(!filter.should_deliver(&json!(20.5)));
    }

    #[test]
    fn test_change_filter_exact_and_non_numeric() {
        let mut filter = ChangeFilter::new(true, 0.0);
        assert!(filter.should_deliver(&json!("RUN")));
        assert!(!filter.should_deliver(&json!("RUN")));
        assert!(filter.should_deliver(&json!("STOP")));
        assert!(filter.should_deliver(&json!(1)));
        assert!(!filter.should_deliver(&json!(1)));

        filter.reset();
        assert!(filter.should_deliver(&json!(1)));
    }

    #[test]
    fn test_disabled_filter_delivers_everything() {
        let mut filter = ChangeFilter::new(false, 5.0);
        assert!(filter.should_deliver(&json!(1)));
        assert!(filter.should_deliver(&json!(1)));
    }
}
