//! Sensor link types: connection state, link events, configuration and errors.

use crate::sensors::strain::{STRAIN_CHARACTERISTIC_UUID, STRAIN_SERVICE_UUID};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Connection state of the strain sensor link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Discovery in progress
    Scanning,
    /// Connection in progress
    Connecting,
    /// Connected and subscribed (or subscribing)
    Connected,
    /// Transport or negotiation failure; retry with a new scan
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Scanning => write!(f, "Scanning..."),
            ConnectionState::Connecting => write!(f, "Connecting..."),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Error => write!(f, "Error"),
        }
    }
}

/// Events published by the sensor link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// Connection state changed, with a human-readable cause for failures
    StateChanged {
        state: ConnectionState,
        cause: Option<String>,
    },
    /// A sensor was selected for connection
    Discovered { device_id: String, name: String },
    /// Raw notification payload from the strain characteristic
    Frame(Vec<u8>),
}

/// Configuration for the sensor link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Advertised service to filter discovery on
    pub service_uuid: Uuid,
    /// Notifiable characteristic carrying strain samples
    pub characteristic_uuid: Uuid,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            service_uuid: STRAIN_SERVICE_UUID,
            characteristic_uuid: STRAIN_CHARACTERISTIC_UUID,
        }
    }
}

/// Errors that can occur on the sensor link.
///
/// None of these are fatal: each one is reported as [`ConnectionState::Error`]
/// and the caller may start a new scan.
#[derive(Debug, Error)]
pub enum SensorError {
    /// BLE adapter not found or unavailable
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// BLE is not enabled on the system
    #[error("Bluetooth is disabled")]
    BluetoothDisabled,

    /// Permission denied for Bluetooth access
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// Failed to start or stop BLE scanning
    #[error("Failed to scan: {0}")]
    ScanFailed(String),

    /// Connection to sensor failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The strain service is missing on the peripheral
    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    /// The strain characteristic is missing or not notifiable
    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(Uuid),

    /// Failed to subscribe to sensor notifications
    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    /// Generic BLE error
    #[error("BLE error: {0}")]
    BleError(String),
}

impl SensorError {
    /// Whether the error means the radio itself is unusable.
    pub fn is_transport_unavailable(&self) -> bool {
        matches!(
            self,
            SensorError::AdapterNotFound
                | SensorError::BluetoothDisabled
                | SensorError::PermissionDenied
        )
    }
}
