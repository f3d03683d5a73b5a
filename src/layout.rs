//! Frame layout and per-opcode metadata.
//!
//! Every offset, mask and timing value the validator, the assembler and the
//! driver need lives here, so the generic and typed entry points read the
//! same numbers.

use std::time::Duration;

use crate::types::Opcode;

// Frame positions
pub const COUNT_IDX: usize = 0;
pub const OPCODE_IDX: usize = 1;
pub const PARAM1_IDX: usize = 2;
pub const PARAM2_IDX: usize = 3;
pub const DATA_IDX: usize = 5;

/// Count, op-code, param1, two param2 bytes and the two checksum bytes
pub const CMD_SIZE_MIN: usize = 7;
pub const CMD_SIZE_MAX: usize = 84;
pub const CRC_SIZE: usize = 2;

/// Count, status byte and checksum
pub const RSP_SIZE_MIN: usize = 4;
pub const RSP_SIZE_MAX: usize = 35;
/// Position of the first payload byte in a response frame
pub const RSP_DATA_IDX: usize = 1;

// Zones
pub const ZONE_CONFIG: u8 = 0x00;
pub const ZONE_OTP: u8 = 0x01;
pub const ZONE_DATA: u8 = 0x02;
pub const ZONE_MASK: u8 = 0x03;
/// Zone flag selecting 32-byte instead of 4-byte access
pub const ZONE_COUNT_FLAG: u8 = 0x80;
pub const ZONE_ACCESS_4: usize = 4;
pub const ZONE_ACCESS_32: usize = 32;
pub const ADDRESS_MASK: u16 = 0x007F;

pub const KEY_ID_MAX: u16 = 15;
pub const OTP_BLOCK_MAX: u16 = 1;

// CheckMac
pub const CHECKMAC_MODE_MASK: u8 = 0x21;
pub const CHECKMAC_CLIENT_CHALLENGE_SIZE: usize = 32;
pub const CHECKMAC_CLIENT_RESPONSE_SIZE: usize = 32;
pub const CHECKMAC_OTHER_DATA_SIZE: usize = 13;

// DeriveKey
pub const DERIVE_KEY_RANDOM_FLAG: u8 = 0x04;
pub const DERIVE_KEY_MAC_SIZE: usize = 32;

// GenDig
pub const GENDIG_ZONE_OTP: u8 = 0x01;
pub const GENDIG_ZONE_DATA: u8 = 0x02;
pub const GENDIG_OTHER_DATA_SIZE: usize = 4;

// HMAC
pub const HMAC_MODE_MASK: u8 = 0x74;

// Lock
pub const LOCK_ZONE_NO_CONFIG: u8 = 0x01;
pub const LOCK_ZONE_NO_CRC: u8 = 0x80;
pub const LOCK_ZONE_MASK: u8 = 0x81;

// MAC
pub const MAC_MODE_BLOCK2_TEMPKEY: u8 = 0x01;
pub const MAC_MODE_BLOCK1_TEMPKEY: u8 = 0x02;
pub const MAC_MODE_SOURCE_FLAG_MATCH: u8 = 0x04;
pub const MAC_MODE_INCLUDE_OTP_88: u8 = 0x10;
pub const MAC_MODE_INCLUDE_OTP_64: u8 = 0x20;
pub const MAC_MODE_INCLUDE_SN: u8 = 0x40;
pub const MAC_MODE_MASK: u8 = 0x77;
pub const MAC_CHALLENGE_SIZE: usize = 32;

// Nonce
pub const NONCE_MODE_SEED_UPDATE: u8 = 0x00;
pub const NONCE_MODE_NO_SEED_UPDATE: u8 = 0x01;
pub const NONCE_MODE_INVALID: u8 = 0x02;
pub const NONCE_MODE_PASSTHROUGH: u8 = 0x03;
pub const NONCE_NUMIN_SIZE: usize = 20;
pub const NONCE_NUMIN_SIZE_PASSTHROUGH: usize = 32;

// Random
pub const RANDOM_SEED_UPDATE: u8 = 0x00;
pub const RANDOM_NO_SEED_UPDATE: u8 = 0x01;

// Read
pub const READ_ZONE_MODE_32_BYTES: u8 = 0x80;
pub const READ_ZONE_MASK: u8 = 0x83;

// UpdateExtra
pub const UPDATE_CONFIG_BYTE_85: u8 = 0x00;
pub const UPDATE_CONFIG_BYTE_86: u8 = 0x01;

// Write
pub const WRITE_ZONE_MASK: u8 = 0xC3;
pub const WRITE_ZONE_WITH_MAC: u8 = 0x40;
pub const WRITE_MAC_SIZE: usize = 32;

/// How the expected response length of an op-code is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseSize {
    Fixed(usize),
    /// 4 bytes in pass-through mode, 35 otherwise
    NonceMode,
    /// 35 bytes with the 32-byte zone flag, 7 otherwise
    ReadZone,
}

/// One row of the op-code metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpcodeInfo {
    /// Typical execution time; the first poll happens after this many ms
    pub delay_ms: u64,
    /// Worst case execution time in ms
    pub exec_max_ms: u64,
    pub response: ResponseSize,
}

impl Opcode {
    pub(crate) const fn info(self) -> OpcodeInfo {
        use ResponseSize::*;

        let (delay_ms, exec_max_ms, response) = match self {
            Opcode::CheckMac => (12, 38, Fixed(4)),
            Opcode::DeriveKey => (14, 62, Fixed(4)),
            Opcode::DevRev => (1, 2, Fixed(7)),
            Opcode::GenDig => (11, 43, Fixed(4)),
            Opcode::Hmac => (27, 69, Fixed(35)),
            Opcode::Lock => (5, 24, Fixed(4)),
            Opcode::Mac => (12, 35, Fixed(35)),
            Opcode::Nonce => (22, 60, NonceMode),
            Opcode::Pause => (1, 2, Fixed(4)),
            Opcode::Random => (11, 50, Fixed(35)),
            Opcode::Read => (1, 4, ReadZone),
            Opcode::TempSense => (4, 11, Fixed(7)),
            Opcode::UpdateExtra => (4, 6, Fixed(4)),
            Opcode::Write => (4, 42, Fixed(4)),
        };

        OpcodeInfo {
            delay_ms,
            exec_max_ms,
            response,
        }
    }

    /// Minimum time before the device's response can be ready
    pub fn poll_delay(self) -> Duration {
        Duration::from_millis(self.info().delay_ms)
    }

    /// Additional time to keep polling after the poll delay has passed
    pub fn poll_timeout(self) -> Duration {
        let info = self.info();
        Duration::from_millis(info.exec_max_ms - info.delay_ms)
    }

    /// Expected length of the response frame, count byte and checksum included
    pub fn response_size(self, param1: u8) -> usize {
        match self.info().response {
            ResponseSize::Fixed(size) => size,
            ResponseSize::NonceMode if param1 == NONCE_MODE_PASSTHROUGH => 4,
            ResponseSize::NonceMode => 35,
            ResponseSize::ReadZone if param1 & ZONE_COUNT_FLAG != 0 => 35,
            ResponseSize::ReadZone => 7,
        }
    }
}

/// Serialized value of param2.
///
/// Read and Write take a byte address for the data zone, which the device
/// expects as a word address. All zone addresses are masked to the device's
/// address width, so data zone words past 0x7F wrap to a low word.
pub(crate) fn encode_param2(opcode: Opcode, param1: u8, param2: u16) -> u16 {
    match opcode {
        Opcode::Read | Opcode::Write => word_address(param1, param2) & ADDRESS_MASK,
        _ => param2,
    }
}

pub(crate) fn word_address(zone: u8, address: u16) -> u16 {
    if zone & ZONE_DATA != 0 {
        address >> 2
    } else {
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_response_size_follows_mode() {
        assert_eq!(Opcode::Nonce.response_size(NONCE_MODE_PASSTHROUGH), 4);
        assert_eq!(Opcode::Nonce.response_size(NONCE_MODE_SEED_UPDATE), 35);
        assert_eq!(Opcode::Nonce.response_size(NONCE_MODE_NO_SEED_UPDATE), 35);
    }

    #[test]
    fn test_read_response_size_follows_count_flag() {
        assert_eq!(Opcode::Read.response_size(ZONE_CONFIG), 7);
        assert_eq!(Opcode::Read.response_size(ZONE_DATA | READ_ZONE_MODE_32_BYTES), 35);
    }

    #[test]
    fn test_poll_timeout_is_exec_max_minus_delay() {
        assert_eq!(Opcode::CheckMac.poll_delay(), Duration::from_millis(12));
        assert_eq!(Opcode::CheckMac.poll_timeout(), Duration::from_millis(26));
        assert_eq!(Opcode::Hmac.poll_timeout(), Duration::from_millis(42));
    }

    #[test]
    fn test_response_sizes_within_bounds() {
        let opcodes = [
            Opcode::CheckMac,
            Opcode::DeriveKey,
            Opcode::DevRev,
            Opcode::GenDig,
            Opcode::Hmac,
            Opcode::Lock,
            Opcode::Mac,
            Opcode::Nonce,
            Opcode::Pause,
            Opcode::Random,
            Opcode::Read,
            Opcode::TempSense,
            Opcode::UpdateExtra,
            Opcode::Write,
        ];
        for opcode in opcodes {
            for param1 in [0x00, 0x03, 0x80] {
                let size = opcode.response_size(param1);
                assert!((RSP_SIZE_MIN..=RSP_SIZE_MAX).contains(&size), "{:?}", opcode);
            }
            assert!(opcode.info().exec_max_ms > opcode.info().delay_ms);
        }
    }

    #[test]
    fn test_data_zone_address_is_word_shifted_and_masked() {
        assert_eq!(encode_param2(Opcode::Read, ZONE_DATA, 0x0020), 0x0008);
        assert_eq!(encode_param2(Opcode::Write, ZONE_DATA | ZONE_COUNT_FLAG, 0x0100), 0x0040);
        assert_eq!(encode_param2(Opcode::Read, ZONE_CONFIG, 0x0085), 0x0005);
        assert_eq!(encode_param2(Opcode::Hmac, 0x04, 0x1234), 0x1234);
    }

    #[test]
    fn test_data_zone_address_past_mask_wraps() {
        // word 0x80 does not fit in 7 bits
        assert_eq!(encode_param2(Opcode::Read, ZONE_DATA, 0x0200), 0x0000);
        assert_eq!(encode_param2(Opcode::Write, ZONE_DATA | ZONE_COUNT_FLAG, 0x0220), 0x0008);
    }
}
