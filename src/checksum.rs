//! CRC-16 used on both directions of the wire.
//!
//! Polynomial 0x8005, zero init, data bits fed LSB first, register not
//! reflected on output. The two checksum bytes go out low byte first.

use crc::{Algorithm, Crc};

use crate::layout::CRC_SIZE;

const CRC_16_SHA204: Algorithm<u16> = Algorithm {
    width: 16,
    poly: 0x8005,
    init: 0x0000,
    refin: true,
    refout: false,
    xorout: 0x0000,
    check: 0xBCDD,
    residue: 0x0000,
};

const SHA204_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_SHA204);

/// Checksum of `data`, in wire order
pub fn calculate(data: &[u8]) -> [u8; CRC_SIZE] {
    SHA204_CRC.checksum(data).to_le_bytes()
}

/// Computes the checksum over `buffer[..len]` and writes it at `buffer[len..len + 2]`.
///
/// The caller guarantees the buffer holds at least `len + 2` bytes.
pub fn append(buffer: &mut [u8], len: usize) {
    let crc = calculate(&buffer[..len]);
    buffer[len..len + CRC_SIZE].copy_from_slice(&crc);
}

/// True when the last two bytes of `frame` are the checksum of the rest
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < CRC_SIZE {
        return false;
    }
    let (body, crc) = frame.split_at(frame.len() - CRC_SIZE);
    calculate(body) == crc
}
