//! Strain sensor link: BLE discovery, connection and notification streaming.
//!
//! One link talks to at most one peripheral. The first device advertising the
//! strain service during a scan is selected and every later discovery is
//! ignored until the next scan. Failures never propagate to the caller; they
//! surface as [`ConnectionState::Error`] with a cause, and the caller retries by
//! scanning again. There is no auto-reconnect.

use crate::sensors::types::{ConnectionState, LinkConfig, LinkEvent, SensorError};
use btleplug::api::{
    Central, CentralEvent, CentralState, CharPropFlags, Characteristic, Manager as _,
    Peripheral as _, PeripheralProperties, ScanFilter, Service, ValueNotification,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use crossbeam::channel::{Receiver, Sender};
use futures::stream::{Stream, StreamExt};
use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Connection lifecycle bookkeeping, independent of the radio.
///
/// Every method that changes [`ConnectionState`] returns the event to publish.
/// Each scan gets a new generation number; work started for an older scan is
/// recognized with [`LinkTracker::is_current`] and must not touch the state.
#[derive(Debug, Default)]
pub struct LinkTracker {
    state: ConnectionState,
    scan: u64,
    selected: Option<String>,
    last_error: Option<String>,
}

impl LinkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Generation of the current scan.
    pub fn scan(&self) -> u64 {
        self.scan
    }

    /// Device chosen during the current scan, if any.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Cause of the most recent transition into `Error`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether `device_id` is still the selection of scan `scan`.
    pub fn is_current(&self, scan: u64, device_id: &str) -> bool {
        self.scan == scan && self.selected.as_deref() == Some(device_id)
    }

    /// Forget any remembered peripheral and enter `Scanning`.
    pub fn begin_scan(&mut self) -> LinkEvent {
        self.scan += 1;
        self.selected = None;
        self.last_error = None;
        self.transition(ConnectionState::Scanning, None)
    }

    /// Offer a discovered device. Returns `Some` only for the first candidate
    /// of a scan, which moves the link to `Connecting`.
    pub fn select(&mut self, device_id: &str) -> Option<LinkEvent> {
        if self.state != ConnectionState::Scanning || self.selected.is_some() {
            return None;
        }
        self.selected = Some(device_id.to_string());
        Some(self.transition(ConnectionState::Connecting, None))
    }

    /// The selected device accepted the connection.
    pub fn on_connected(&mut self, device_id: &str) -> Option<LinkEvent> {
        if self.selected.as_deref() != Some(device_id) {
            return None;
        }
        Some(self.transition(ConnectionState::Connected, None))
    }

    /// A device dropped its link. Ignored unless it is the selected one.
    pub fn on_disconnected(&mut self, device_id: &str) -> Option<LinkEvent> {
        if self.selected.as_deref() != Some(device_id) {
            return None;
        }
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Error
        ) {
            return None;
        }
        Some(self.transition(ConnectionState::Disconnected, None))
    }

    /// Caller-requested teardown.
    pub fn on_closed(&mut self) -> Option<LinkEvent> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        Some(self.transition(ConnectionState::Disconnected, None))
    }

    /// Any transport, connection or negotiation failure.
    pub fn on_failure(&mut self, cause: impl Into<String>) -> LinkEvent {
        let cause = cause.into();
        self.last_error = Some(cause.clone());
        self.transition(ConnectionState::Error, Some(cause))
    }

    /// A connection attempt for `device_id` failed. Ignored when the attempt
    /// belongs to an earlier scan or another device.
    pub fn on_connect_failed(
        &mut self,
        scan: u64,
        device_id: &str,
        cause: impl Into<String>,
    ) -> Option<LinkEvent> {
        if !self.is_current(scan, device_id) {
            return None;
        }
        Some(self.on_failure(cause))
    }

    fn transition(&mut self, state: ConnectionState, cause: Option<String>) -> LinkEvent {
        tracing::info!("Sensor link: {} -> {}", self.state, state);
        self.state = state;
        LinkEvent::StateChanged { state, cause }
    }
}

/// Find the notifiable strain characteristic inside the strain service.
pub fn find_strain_characteristic(
    services: &BTreeSet<Service>,
    config: &LinkConfig,
) -> Result<Characteristic, SensorError> {
    let service = services
        .iter()
        .find(|s| s.uuid == config.service_uuid)
        .ok_or(SensorError::ServiceNotFound(config.service_uuid))?;

    service
        .characteristics
        .iter()
        .find(|c| {
            c.uuid == config.characteristic_uuid
                && c.properties
                    .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE)
        })
        .cloned()
        .ok_or(SensorError::CharacteristicNotFound(
            config.characteristic_uuid,
        ))
}

/// Map the radio power state reported by the adapter.
pub fn check_adapter_state(state: CentralState) -> Result<(), SensorError> {
    match state {
        CentralState::PoweredOff => Err(SensorError::BluetoothDisabled),
        CentralState::PoweredOn | CentralState::Unknown => Ok(()),
    }
}

/// Whether advertised properties are compatible with the strain service.
///
/// Some platforms deliver discoveries before the service list is known, so an
/// empty list is accepted and left to service discovery to reject.
fn advertises_service(properties: Option<&PeripheralProperties>, config: &LinkConfig) -> bool {
    match properties {
        Some(props) if !props.services.is_empty() => props.services.contains(&config.service_uuid),
        _ => true,
    }
}

fn map_ble_error(error: btleplug::Error) -> SensorError {
    match error {
        btleplug::Error::PermissionDenied => SensorError::PermissionDenied,
        other => SensorError::BleError(other.to_string()),
    }
}

/// Run `release` when `result` is an error, then hand the result back.
async fn release_on_failure<T, F, Fut>(
    result: Result<T, SensorError>,
    release: F,
) -> Result<T, SensorError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    if result.is_err() {
        release().await;
    }
    result
}

type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;
type Notifications = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;
type TaskList = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// State shared between the link and the background tasks of one scan.
#[derive(Clone)]
struct LinkContext {
    adapter: Adapter,
    config: LinkConfig,
    /// Scan generation this context was created for
    scan: u64,
    tracker: Arc<Mutex<LinkTracker>>,
    peripheral: Arc<Mutex<Option<Peripheral>>>,
    /// Connect and forwarding tasks, aborted on rescan and disconnect
    tasks: TaskList,
    event_tx: Option<Sender<LinkEvent>>,
}

impl LinkContext {
    fn send(&self, event: LinkEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    async fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    async fn fail(&self, device_id: &str, error: SensorError) {
        let event = self
            .tracker
            .lock()
            .await
            .on_connect_failed(self.scan, device_id, error.to_string());
        match event {
            Some(event) => {
                tracing::error!("Sensor link failure: {}", error);
                self.send(event);
            }
            None => tracing::debug!(
                "Ignoring failure of superseded connection to {}: {}",
                device_id,
                error
            ),
        }
    }

    /// Consume adapter events until the adapter stream ends.
    async fn run_central_events(self, mut events: CentralEvents) {
        while let Some(event) = events.next().await {
            match event {
                CentralEvent::DeviceDiscovered(id) => self.on_discovered(id).await,
                CentralEvent::DeviceDisconnected(id) => {
                    let event = self.tracker.lock().await.on_disconnected(&id.to_string());
                    if let Some(event) = event {
                        tracing::info!("Sensor {} disconnected", id);
                        self.peripheral.lock().await.take();
                        self.send(event);
                    }
                }
                CentralEvent::StateUpdate(state) => {
                    if let Err(e) = check_adapter_state(state) {
                        let event = self.tracker.lock().await.on_failure(e.to_string());
                        tracing::error!("Sensor link failure: {}", e);
                        self.peripheral.lock().await.take();
                        self.send(event);
                    }
                }
                _ => {}
            }
        }
        tracing::debug!("Adapter event stream ended");
    }

    async fn on_discovered(&self, id: PeripheralId) {
        let peripheral = match self.adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("Discovered peripheral {} vanished: {}", id, e);
                return;
            }
        };

        let properties = peripheral.properties().await.ok().flatten();
        if !advertises_service(properties.as_ref(), &self.config) {
            return;
        }

        let device_id = id.to_string();
        let Some(event) = self.tracker.lock().await.select(&device_id) else {
            tracing::trace!("Ignoring discovery of {} (already selected)", device_id);
            return;
        };

        let name = properties
            .and_then(|p| p.local_name)
            .unwrap_or_else(|| "No Name".to_string());
        tracing::info!("Discovered strain sensor {} ({})", name, device_id);

        self.send(LinkEvent::Discovered {
            device_id: device_id.clone(),
            name,
        });
        self.send(event);

        let ctx = self.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = ctx.connect(peripheral, &device_id).await {
                ctx.fail(&device_id, e).await;
            }
        });
        self.track(task).await;
    }

    /// Connect, negotiate and subscribe, then forward notifications.
    ///
    /// Once the peripheral accepts the connection it sits in the shared slot
    /// until released. A failed negotiation disconnects it before the failure
    /// is reported.
    async fn connect(&self, peripheral: Peripheral, device_id: &str) -> Result<(), SensorError> {
        peripheral
            .connect()
            .await
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;

        {
            let mut tracker = self.tracker.lock().await;
            if !tracker.is_current(self.scan, device_id) {
                drop(tracker);
                tracing::debug!("Scan superseded, dropping connection to {}", device_id);
                self.release(&peripheral, device_id).await;
                return Ok(());
            }
            *self.peripheral.lock().await = Some(peripheral.clone());
            if let Some(event) = tracker.on_connected(device_id) {
                self.send(event);
            }
        }

        let negotiated = self.negotiate(&peripheral).await;
        let connected = &peripheral;
        let notifications =
            release_on_failure(negotiated, move || self.release(connected, device_id)).await?;

        if !self.tracker.lock().await.is_current(self.scan, device_id) {
            self.release(&peripheral, device_id).await;
            return Ok(());
        }

        let forwarder =
            tokio::spawn(self.clone().forward_notifications(notifications, device_id.to_string()));
        self.track(forwarder).await;
        Ok(())
    }

    async fn negotiate(&self, peripheral: &Peripheral) -> Result<Notifications, SensorError> {
        peripheral
            .discover_services()
            .await
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;

        let characteristic = find_strain_characteristic(&peripheral.services(), &self.config)?;

        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))?;
        tracing::debug!("Subscribed to characteristic: {}", characteristic.uuid);

        if let Err(e) = self.adapter.stop_scan().await {
            tracing::warn!("Failed to stop scanning: {}", e);
        }

        peripheral
            .notifications()
            .await
            .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))
    }

    /// Drop `peripheral` from the shared slot if this scan still owns it and
    /// close its connection.
    async fn release(&self, peripheral: &Peripheral, device_id: &str) {
        {
            let tracker = self.tracker.lock().await;
            if tracker.is_current(self.scan, device_id) {
                self.peripheral.lock().await.take();
            }
        }
        if let Err(e) = peripheral.disconnect().await {
            tracing::warn!("Failed to release peripheral {}: {}", device_id, e);
        }
    }

    async fn forward_notifications(self, mut notifications: Notifications, device_id: String) {
        let characteristic_uuid = self.config.characteristic_uuid;

        while let Some(notification) = notifications.next().await {
            if notification.uuid == characteristic_uuid {
                self.send(LinkEvent::Frame(notification.value));
            }
        }

        // Stream ended - peripheral disconnected
        let mut tracker = self.tracker.lock().await;
        if !tracker.is_current(self.scan, &device_id) {
            return;
        }
        if let Some(event) = tracker.on_disconnected(&device_id) {
            self.peripheral.lock().await.take();
            self.send(event);
        }
    }
}

/// Manages the single strain sensor connection.
pub struct StrainLink {
    /// Configuration
    config: LinkConfig,
    /// BLE adapter
    adapter: Option<Adapter>,
    /// Channel for sending link events
    event_tx: Option<Sender<LinkEvent>>,
    /// Connection lifecycle
    tracker: Arc<Mutex<LinkTracker>>,
    /// Connected peripheral, owned exclusively by the link
    peripheral: Arc<Mutex<Option<Peripheral>>>,
    /// Adapter event loop of the current scan
    central_task: Option<JoinHandle<()>>,
    /// Connect and forwarding tasks of the current scan
    tasks: TaskList,
}

impl StrainLink {
    /// Create a new link.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            adapter: None,
            event_tx: None,
            tracker: Arc::new(Mutex::new(LinkTracker::new())),
            peripheral: Arc::new(Mutex::new(None)),
            central_task: None,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a new link for the default strain service.
    pub fn with_defaults() -> Self {
        Self::new(LinkConfig::default())
    }

    /// Get an event receiver for link events.
    pub fn event_receiver(&mut self) -> Receiver<LinkEvent> {
        let (tx, rx) = crossbeam::channel::unbounded();
        self.event_tx = Some(tx);
        rx
    }

    fn send_event(&self, event: LinkEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Initialize the BLE adapter.
    pub async fn initialize(&mut self) -> Result<(), SensorError> {
        tracing::info!("Initializing strain sensor link");

        let manager = Manager::new().await.map_err(map_ble_error)?;
        let adapters = manager.adapters().await.map_err(map_ble_error)?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(SensorError::AdapterNotFound)?;

        match adapter.adapter_state().await {
            Ok(state) => check_adapter_state(state)?,
            Err(e) => tracing::debug!("Adapter power state unavailable: {}", e),
        }

        tracing::info!("BLE adapter initialized");
        self.adapter = Some(adapter);
        Ok(())
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.tracker.lock().await.state()
    }

    /// Cause of the last failure, if the link is in `Error`.
    pub async fn last_error(&self) -> Option<String> {
        self.tracker.lock().await.last_error().map(str::to_string)
    }

    /// Start a fresh scan for the strain sensor.
    ///
    /// Never fails: problems are published as `Error` and the caller may
    /// simply call this again.
    pub async fn start_scan(&mut self) {
        if let Err(e) = self.try_start_scan().await {
            tracing::error!("Failed to start scan: {}", e);
            let event = self.tracker.lock().await.on_failure(e.to_string());
            self.send_event(event);
        }
    }

    async fn try_start_scan(&mut self) -> Result<(), SensorError> {
        self.stop_tasks().await;
        self.release_peripheral().await;

        let (event, scan) = {
            let mut tracker = self.tracker.lock().await;
            (tracker.begin_scan(), tracker.scan())
        };
        self.send_event(event);

        if self.adapter.is_none() {
            self.initialize().await?;
        }
        let adapter = self
            .adapter
            .clone()
            .ok_or(SensorError::AdapterNotFound)?;

        // Subscribe before scanning so no discovery is missed
        let events = adapter.events().await.map_err(map_ble_error)?;

        adapter
            .start_scan(ScanFilter {
                services: vec![self.config.service_uuid],
            })
            .await
            .map_err(|e| match map_ble_error(e) {
                SensorError::BleError(msg) => SensorError::ScanFailed(msg),
                other => other,
            })?;

        tracing::info!(
            "Started scanning for peripherals with service UUID: {}",
            self.config.service_uuid
        );

        let ctx = LinkContext {
            adapter,
            config: self.config.clone(),
            scan,
            tracker: self.tracker.clone(),
            peripheral: self.peripheral.clone(),
            tasks: self.tasks.clone(),
            event_tx: self.event_tx.clone(),
        };
        self.central_task = Some(tokio::spawn(ctx.run_central_events(events)));
        Ok(())
    }

    /// Abort the adapter loop and every connect or forwarding task.
    async fn stop_tasks(&mut self) {
        if let Some(task) = self.central_task.take() {
            task.abort();
        }
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    /// Disconnect the current peripheral, if any.
    pub async fn disconnect(&mut self) -> Result<(), SensorError> {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        let peripheral = self.peripheral.lock().await.take();
        if let Some(peripheral) = peripheral {
            tracing::info!("Disconnecting from strain sensor");
            peripheral.disconnect().await.map_err(map_ble_error)?;
        }

        if let Some(event) = self.tracker.lock().await.on_closed() {
            self.send_event(event);
        }
        Ok(())
    }

    async fn release_peripheral(&self) {
        if let Some(peripheral) = self.peripheral.lock().await.take() {
            if let Err(e) = peripheral.disconnect().await {
                tracing::warn!("Failed to release previous peripheral: {}", e);
            }
        }
    }

    /// Shutdown the link.
    pub async fn shutdown(&mut self) {
        tracing::info!("Shutting down strain sensor link");

        self.stop_tasks().await;
        if let Some(adapter) = &self.adapter {
            let _ = adapter.stop_scan().await;
        }
        let _ = self.disconnect().await;
    }
}
