//! Response frame helpers

use crate::layout::{CRC_SIZE, RSP_DATA_IDX, RSP_SIZE_MIN};

/// Status byte of a 4-byte response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Success,
    /// CheckMac found the client response did not match
    CheckMacMiscompare,
    /// Command was not properly received or had an invalid parameter
    ParseError,
    ExecutionError,
    /// First response after the device woke up
    WakeReceived,
    /// The device saw a bad checksum or another communication error
    CommunicationError,
    Unknown(u8),
}

impl From<u8> for DeviceStatus {
    fn from(value: u8) -> Self {
        match value {
            0x00 => DeviceStatus::Success,
            0x01 => DeviceStatus::CheckMacMiscompare,
            0x03 => DeviceStatus::ParseError,
            0x0F => DeviceStatus::ExecutionError,
            0x11 => DeviceStatus::WakeReceived,
            0xFF => DeviceStatus::CommunicationError,
            other => DeviceStatus::Unknown(other),
        }
    }
}

/// Payload of a response frame: everything between the count byte and the checksum.
///
/// The count byte decides the length; a frame shorter than it claims yields
/// whatever payload bytes are present.
pub fn payload(frame: &[u8]) -> &[u8] {
    let Some(&count) = frame.first() else {
        return &[];
    };
    let end = (count as usize).min(frame.len()).saturating_sub(CRC_SIZE);
    frame.get(RSP_DATA_IDX..end).unwrap_or(&[])
}

/// Status byte carried by a minimal response, if `frame` is one
pub fn status(frame: &[u8]) -> Option<DeviceStatus> {
    match frame.first() {
        Some(&count) if count as usize == RSP_SIZE_MIN && frame.len() >= RSP_SIZE_MIN => {
            Some(DeviceStatus::from(frame[RSP_DATA_IDX]))
        }
        _ => None,
    }
}

/// Raw temperature from a TempSense response frame.
///
/// The payload starts with two big-endian values; the raw reading is their
/// difference. Converting to degrees needs the offset stored in the
/// configuration zone: `T(C) = 0.855 * (raw + offset - 334)`.
///
/// Returns `None` when the frame carries fewer than four payload bytes, such
/// as a status-only response.
pub fn temp_raw(frame: &[u8]) -> Option<u16> {
    match *payload(frame) {
        [a, b, c, d, ..] => Some(decode_temp(&[a, b, c, d])),
        _ => None,
    }
}

/// Raw temperature from the first four payload bytes
pub fn decode_temp(data: &[u8; 4]) -> u16 {
    let temp_high = u16::from_be_bytes([data[0], data[1]]);
    let temp_low = u16::from_be_bytes([data[2], data[3]]);
    temp_high.wrapping_sub(temp_low)
}
