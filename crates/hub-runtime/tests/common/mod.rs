//! Shared fixtures: fake protocol links that count lifecycle calls, record
//! them in a shared journal, and can be told to fail.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hub_runtime::{CancellationToken, Connection, ConnectionError, Lifecycle, Publisher};
use parking_lot::Mutex;

/// Ordered record of lifecycle calls across links, e.g. `"connect:plc"`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Behavior shared by every fake link.
pub struct LinkState {
    pub name: &'static str,
    journal: Journal,
    connected: AtomicBool,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub disposes: AtomicUsize,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    fail_dispose: AtomicBool,
    cancel_on_connect: Mutex<Option<CancellationToken>>,
    cancel_on_disconnect: Mutex<Option<CancellationToken>>,
}

impl LinkState {
    fn new(name: &'static str, journal: Journal) -> Self {
        Self {
            name,
            journal,
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            disposes: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            fail_disconnect: AtomicBool::new(false),
            fail_dispose: AtomicBool::new(false),
            cancel_on_connect: Mutex::new(None),
            cancel_on_disconnect: Mutex::new(None),
        }
    }

    pub fn fail_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn fail_disconnect(&self) {
        self.fail_disconnect.store(true, Ordering::SeqCst);
    }

    pub fn fail_dispose(&self) {
        self.fail_dispose.store(true, Ordering::SeqCst);
    }

    /// Fire `token` while connecting, as if the caller gave up mid-sequence.
    pub fn cancel_while_connecting(&self, token: CancellationToken) {
        *self.cancel_on_connect.lock() = Some(token);
    }

    /// Fire `token` while disconnecting and report the call as cancelled.
    pub fn cancel_while_disconnecting(&self, token: CancellationToken) {
        *self.cancel_on_disconnect.lock() = Some(token);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.disposes.load(Ordering::SeqCst)
    }

    async fn connect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("connect:{}", self.name));

        let pending = self.cancel_on_connect.lock().take();
        if let Some(token) = pending {
            token.cancel();
        }
        if cancel.is_cancelled() {
            return Err(ConnectionError::Cancelled);
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ConnectionError::Io(format!("{} unreachable", self.name)));
        }

        tokio::task::yield_now().await;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("disconnect:{}", self.name));

        let pending = self.cancel_on_disconnect.lock().take();
        if let Some(token) = pending {
            token.cancel();
        }
        if cancel.is_cancelled() {
            return Err(ConnectionError::Cancelled);
        }
        self.connected.store(false, Ordering::SeqCst);

        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(ConnectionError::Protocol(format!("{} refused close", self.name)));
        }
        Ok(())
    }

    fn dispose(&self) -> Result<(), ConnectionError> {
        self.disposes.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("dispose:{}", self.name));
        self.connected.store(false, Ordering::SeqCst);

        if self.fail_dispose.load(Ordering::SeqCst) {
            return Err(ConnectionError::Io(format!("{} handle leaked", self.name)));
        }
        Ok(())
    }
}

/// Industrial controller link: lifecycle only.
pub struct PlcLink {
    pub state: LinkState,
}

impl PlcLink {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            state: LinkState::new(name, journal.clone()),
        }
    }
}

#[async_trait]
impl Lifecycle for PlcLink {
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.state.connect(cancel).await
    }

    async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.state.disconnect(cancel).await
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

#[async_trait]
impl Connection for PlcLink {
    fn name(&self) -> &str {
        self.state.name
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }

    async fn dispose(&self) -> Result<(), ConnectionError> {
        self.state.dispose()
    }
}

/// Message broker link: lifecycle plus publish.
pub struct BrokerLink {
    pub state: LinkState,
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl BrokerLink {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            state: LinkState::new(name, journal.clone()),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Lifecycle for BrokerLink {
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.state.connect(cancel).await
    }

    async fn disconnect(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        self.state.disconnect(cancel).await
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

#[async_trait]
impl Publisher for BrokerLink {
    async fn publish(
        &self,
        address: &str,
        value: serde_json::Value,
        _cancel: &CancellationToken,
    ) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        self.published.lock().push((address.to_string(), value));
        Ok(())
    }
}

#[async_trait]
impl Connection for BrokerLink {
    fn name(&self) -> &str {
        self.state.name
    }

    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }

    fn publisher(self: Arc<Self>) -> Option<Arc<dyn Publisher>> {
        Some(self)
    }

    async fn dispose(&self) -> Result<(), ConnectionError> {
        self.state.dispose()
    }
}

/// A link with no lifecycle; always ready.
pub struct StaticLink {
    pub name: &'static str,
    pub disposes: AtomicUsize,
}

impl StaticLink {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            disposes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Connection for StaticLink {
    fn name(&self) -> &str {
        self.name
    }

    async fn dispose(&self) -> Result<(), ConnectionError> {
        self.disposes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Route hub logs to the test harness output.
pub fn init_logging() {
    let _ = hub_telemetry::init_logging(&hub_telemetry::TelemetryConfig::for_tests());
}
