//! Unit tests for strain frame decoding.

use strainsense::sensors::strain::{decode_frame, encode_frame, DecodeError};

#[test]
fn test_decode_yields_half_as_many_samples() {
    for len in [2usize, 4, 20, 244] {
        let frame: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let samples = decode_frame(&frame).unwrap();
        assert_eq!(samples.len(), len / 2);
    }
}

#[test]
fn test_decode_little_endian() {
    // 0x0271 = 625, 0x01F4 = 500
    let frame = [0x71, 0x02, 0xF4, 0x01];
    assert_eq!(decode_frame(&frame).unwrap(), vec![625, 500]);
}

#[test]
fn test_decode_rejects_odd_lengths() {
    for len in [1usize, 3, 5, 21] {
        let frame = vec![0u8; len];
        assert_eq!(decode_frame(&frame), Err(DecodeError::MalformedFrame(len)));
    }
}

#[test]
fn test_decode_rejects_empty_frame() {
    assert!(decode_frame(&[]).is_err());
}

#[test]
fn test_decode_zero_samples() {
    assert_eq!(decode_frame(&[0, 0, 0, 0]).unwrap(), vec![0, 0]);
}

#[test]
fn test_encoded_frame_matches_wire_layout() {
    assert_eq!(encode_frame(&[630, 620]), vec![0x76, 0x02, 0x6C, 0x02]);
}
