//! Sensor module for the BLE strain sensor link and its wire format.

pub mod link;
pub mod strain;
pub mod types;

pub use link::{LinkTracker, StrainLink};
pub use strain::{decode_frame, DecodeError, STRAIN_CHARACTERISTIC_UUID, STRAIN_SERVICE_UUID};
pub use types::{ConnectionState, LinkConfig, LinkEvent, SensorError};
