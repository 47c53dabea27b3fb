//! # Handler Activation Tests
//!
//! Auto-wiring of hub, connection, publisher, logger and resolver-backed
//! parameters, and message dispatch through scoped handlers.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{BrokerLink, Journal, PlcLink};
use hub_runtime::{
    Activate, ActivationError, BoxError, CancellationToken, Constructor, Dependency, EventFilter,
    EventTopic, Hub, HubBuilder, HubError, HubEvent, InboundMessage, Instance, Logger,
    MessageHandler, Publisher, ResolveError, ServiceMap,
};
use serde_json::json;
use tokio::time::timeout;

// =============================================================================
// HANDLERS
// =============================================================================

struct NeedsHub {
    hub: Arc<Hub>,
}

impl Activate for NeedsHub {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Dependency::hub()], |args| {
            Ok(Self { hub: args.next()? })
        })]
    }
}

struct TemperatureHandler {
    plc: Arc<PlcLink>,
    hub: Arc<Hub>,
    log: Logger<TemperatureHandler>,
}

impl Activate for TemperatureHandler {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(
            vec![
                Dependency::connection::<PlcLink>(),
                Dependency::hub(),
                Dependency::logger::<Self>(),
            ],
            |args| {
                Ok(Self {
                    plc: args.next()?,
                    hub: args.next()?,
                    log: args.next()?,
                })
            },
        )]
    }
}

#[async_trait]
impl MessageHandler for TemperatureHandler {
    async fn handle(&self, message: InboundMessage) -> anyhow::Result<()> {
        self.log.info("temperature received");
        self.hub.events().emit(HubEvent::custom(
            "temperature",
            self.plc.state.name,
            message.value,
        ));
        Ok(())
    }
}

struct AlarmForwarder {
    publisher: Arc<dyn Publisher>,
}

impl Activate for AlarmForwarder {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Dependency::publisher()], |args| {
            Ok(Self {
                publisher: args.next()?,
            })
        })]
    }
}

#[async_trait]
impl MessageHandler for AlarmForwarder {
    async fn handle(&self, message: InboundMessage) -> anyhow::Result<()> {
        self.publisher
            .publish("plant/alarms", message.value, &CancellationToken::new())
            .await?;
        Ok(())
    }
}

struct NeedsBroker {
    _broker: Arc<BrokerLink>,
}

impl Activate for NeedsBroker {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Dependency::connection::<BrokerLink>()], |args| {
            Ok(Self {
                _broker: args.next()?,
            })
        })]
    }
}

#[derive(Clone)]
struct Calibration {
    offset: f64,
}

struct CalibratedReader {
    _plc: Arc<PlcLink>,
    calibration: Calibration,
    _publisher: Arc<dyn Publisher>,
}

impl Activate for CalibratedReader {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(
            vec![
                Dependency::connection::<PlcLink>(),
                Dependency::service::<Calibration>(),
                Dependency::publisher(),
            ],
            |args| {
                Ok(Self {
                    _plc: args.next()?,
                    calibration: args.next()?,
                    _publisher: args.next()?,
                })
            },
        )]
    }
}

struct Rejecting;

impl Activate for Rejecting {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(Vec::new(), |_| Ok(Self))]
    }
}

#[async_trait]
impl MessageHandler for Rejecting {
    async fn handle(&self, message: InboundMessage) -> anyhow::Result<()> {
        anyhow::bail!("value out of range at {}", message.address)
    }
}

#[derive(Clone)]
struct UnitOfWork {
    id: usize,
}

struct ScopedHandler {
    work: UnitOfWork,
}

impl Activate for ScopedHandler {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Dependency::service::<UnitOfWork>()], |args| {
            Ok(Self { work: args.next()? })
        })]
    }
}

#[async_trait]
impl MessageHandler for ScopedHandler {
    async fn handle(&self, _message: InboundMessage) -> anyhow::Result<()> {
        anyhow::ensure!(self.work.id > 0, "unit of work not started");
        Ok(())
    }
}

fn plc_hub(journal: &Journal) -> (Arc<Hub>, Arc<PlcLink>) {
    let plc = Arc::new(PlcLink::new("plc", journal));
    let hub = HubBuilder::new()
        .detached()
        .add_connection_instance(plc.clone())
        .build()
        .unwrap();
    (hub, plc)
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn test_hub_injection_before_and_after_build() {
    let hub = HubBuilder::new()
        .detached()
        .add_connection(|activator, _| {
            match activator.create::<NeedsHub>() {
                Err(ActivationError::NotInitialized { requested, handler }) => {
                    assert_eq!(requested, "Arc<Hub>");
                    assert_eq!(handler, "NeedsHub");
                }
                other => panic!("expected NotInitialized, got {:?}", other.err()),
            }
            Ok::<_, BoxError>(PlcLink::new("plc", &Journal::new()))
        })
        .build()
        .unwrap();

    let handler = hub.activator().create::<NeedsHub>().unwrap();
    assert!(Arc::ptr_eq(&handler.hub, &hub));
}

#[test]
fn test_connection_injection_returns_registered_instance() {
    common::init_logging();
    let (hub, plc) = plc_hub(&Journal::new());

    let handler = hub.activator().create::<TemperatureHandler>().unwrap();
    assert!(Arc::ptr_eq(&handler.plc, &plc));
    assert!(!handler.log.is_enabled());

    let first = hub.connection::<PlcLink>().unwrap();
    let second = hub.connection::<PlcLink>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_missing_connection_shape_lists_available() {
    let (hub, _plc) = plc_hub(&Journal::new());

    match hub.activator().create::<NeedsBroker>() {
        Err(ActivationError::ConnectionNotConfigured {
            shape,
            handler,
            available,
        }) => {
            assert_eq!(shape, "BrokerLink");
            assert_eq!(handler, "NeedsBroker");
            assert_eq!(available, vec!["plc (PlcLink)".to_string()]);
        }
        other => panic!("expected ConnectionNotConfigured, got {:?}", other.err()),
    }
}

#[test]
fn test_publisher_not_available_without_capable_connection() {
    let (hub, _plc) = plc_hub(&Journal::new());

    match hub.activator().create::<AlarmForwarder>() {
        Err(ActivationError::PublisherNotAvailable { shape, handler }) => {
            assert_eq!(shape, "Arc<dyn Publisher>");
            assert_eq!(handler, "AlarmForwarder");
        }
        other => panic!("expected PublisherNotAvailable, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_publisher_is_first_capable_connection() {
    let journal = Journal::new();
    let primary = Arc::new(BrokerLink::new("primary", &journal));
    let backup = Arc::new(BrokerLink::new("backup", &journal));
    let hub = HubBuilder::new()
        .detached()
        .add_connection_instance(Arc::new(PlcLink::new("plc", &journal)))
        .add_connection_instance(primary.clone())
        .add_connection_instance(backup.clone())
        .build()
        .unwrap();
    hub.connect_all(&CancellationToken::new()).await.unwrap();

    hub.activator()
        .dispatch::<AlarmForwarder>(InboundMessage::new("plc", "DB9.DBX0.0", json!(true)))
        .await
        .unwrap();

    assert_eq!(primary.published(), vec![("plant/alarms".to_string(), json!(true))]);
    assert!(backup.published().is_empty());
    hub.dispose().await.unwrap();
}

#[test]
fn test_first_unresolved_parameter_decides_error() {
    let (hub, _plc) = plc_hub(&Journal::new());

    // Calibration is checked before the (also missing) publisher.
    match hub.activator().create::<CalibratedReader>() {
        Err(ActivationError::DependencyResolutionFailed { parameter, handler }) => {
            assert_eq!(parameter, "Calibration");
            assert_eq!(handler, "CalibratedReader");
        }
        other => panic!("expected DependencyResolutionFailed, got {:?}", other.err()),
    }
}

#[test]
fn test_resolver_function_supplies_services() {
    let journal = Journal::new();
    let hub = HubBuilder::new()
        .detached()
        .with_resolver_function(|key| {
            if key.is::<Calibration>() {
                Ok(Instance::new(Calibration { offset: -0.25 }))
            } else {
                Err(ResolveError::not_registered(key))
            }
        })
        .add_connection_instance(Arc::new(PlcLink::new("plc", &journal)))
        .add_connection_instance(Arc::new(BrokerLink::new("broker", &journal)))
        .build()
        .unwrap();

    let reader = hub.activator().create::<CalibratedReader>().unwrap();
    assert!((reader.calibration.offset + 0.25).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_dispatch_runs_handler() {
    let (hub, _plc) = plc_hub(&Journal::new());
    let mut events = hub.subscribe(EventFilter::topics(vec![EventTopic::Application]));

    hub.activator()
        .dispatch::<TemperatureHandler>(InboundMessage::new("plc", "DB1.DBD0", json!(21.5)))
        .await
        .unwrap();

    let event = timeout(Duration::from_millis(100), events.recv())
        .await
        .expect("Should receive within timeout")
        .expect("Should have event");
    assert_eq!(event, HubEvent::custom("temperature", "plc", json!(21.5)));
}

#[tokio::test]
async fn test_handler_error_is_attributed() {
    let (hub, _plc) = plc_hub(&Journal::new());

    let err = hub
        .activator()
        .dispatch::<Rejecting>(InboundMessage::new("plc", "DB1.DBW2", json!(9000)))
        .await
        .unwrap_err();

    match err {
        HubError::Handler { handler, source } => {
            assert_eq!(handler, "Rejecting");
            assert!(source.to_string().contains("DB1.DBW2"));
        }
        other => panic!("expected Handler error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dispatch_surfaces_activation_failure() {
    let (hub, _plc) = plc_hub(&Journal::new());

    let err = hub
        .activator()
        .dispatch::<AlarmForwarder>(InboundMessage::new("plc", "A", json!(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HubError::Activation(ActivationError::PublisherNotAvailable { .. })
    ));
}

#[tokio::test]
async fn test_each_dispatch_gets_its_own_scope() {
    let started = Arc::new(AtomicUsize::new(0));
    let counter = started.clone();
    let services = ServiceMap::new().scoped(move || UnitOfWork {
        id: counter.fetch_add(1, Ordering::SeqCst) + 1,
    });

    let hub = HubBuilder::new()
        .detached()
        .with_service_resolver(Arc::new(services))
        .build()
        .unwrap();

    for _ in 0..3 {
        hub.activator()
            .dispatch::<ScopedHandler>(InboundMessage::new("plc", "A", json!(0)))
            .await
            .unwrap();
    }
    assert_eq!(started.load(Ordering::SeqCst), 3);

    let scoped = hub.activator().create_scoped::<ScopedHandler>().unwrap();
    assert!(scoped.has_scope());
    assert_eq!(scoped.work.id, 4);
    scoped.dispose();
}
