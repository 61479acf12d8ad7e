//! Strain sensor protocol: GATT identifiers and notification frame decoding.
//!
//! The sensor exposes one service (0x180A) with one notifiable characteristic
//! (0x2A57). Each notification carries one or more strain samples, every
//! sample a little-endian `u16`.

use thiserror::Error;
use uuid::Uuid;

/// Strain sensor service UUID (0x180A)
pub const STRAIN_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180a_0000_1000_8000_0080_5f9b_34fb);

/// Strain sample characteristic UUID (0x2A57)
pub const STRAIN_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_2a57_0000_1000_8000_0080_5f9b_34fb);

/// Size of one encoded sample in bytes.
pub const SAMPLE_SIZE: usize = 2;

/// Frame decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame length is zero or not a multiple of the sample size
    #[error("Malformed frame: {0} bytes is not a positive multiple of 2")]
    MalformedFrame(usize),
}

/// Decode a notification frame into raw strain samples, preserving order.
pub fn decode_frame(frame: &[u8]) -> Result<Vec<u16>, DecodeError> {
    if frame.is_empty() || frame.len() % SAMPLE_SIZE != 0 {
        return Err(DecodeError::MalformedFrame(frame.len()));
    }

    Ok(frame
        .chunks_exact(SAMPLE_SIZE)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode samples into a notification frame (used by mocks and replays).
pub fn encode_frame(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
