//! Command validation.
//!
//! Structural checks (op-code, buffer capacity) always run. The per-opcode
//! parameter rules can be switched off through [`Config`].

use crate::layout::*;
use crate::types::{BadParameter, Command, Config, Opcode};

/// Largest frame the count byte can describe
const FRAME_LEN_LIMIT: usize = u8::MAX as usize;

/// Validates `command` for a transmit buffer of `tx_len` bytes.
///
/// Returns the resolved op-code on success.
pub(crate) fn check_command(
    command: &Command<'_>,
    tx_len: usize,
    config: &Config,
) -> Result<Opcode, BadParameter> {
    let opcode = Opcode::try_from(command.opcode)?;

    let frame_len = command.frame_len();
    if frame_len > FRAME_LEN_LIMIT {
        return Err(BadParameter("frame too long for the count byte"));
    }
    if tx_len < frame_len {
        return Err(BadParameter("transmit buffer too small"));
    }

    if config.check_parameters {
        check_parameters(opcode, command)?;
    }

    Ok(opcode)
}

pub(crate) fn check_response_buffer(rx_len: usize, response_size: usize) -> Result<(), BadParameter> {
    if rx_len < RSP_SIZE_MIN || rx_len < response_size {
        return Err(BadParameter("response buffer too small"));
    }
    Ok(())
}

/// Per-opcode parameter rules
pub(crate) fn check_parameters(opcode: Opcode, command: &Command<'_>) -> Result<(), BadParameter> {
    let Command {
        param1,
        param2,
        data1,
        data2,
        data3,
        ..
    } = *command;

    match opcode {
        Opcode::CheckMac => {
            exact(data1, CHECKMAC_CLIENT_CHALLENGE_SIZE, "CheckMac challenge must be 32 bytes")?;
            exact(data2, CHECKMAC_CLIENT_RESPONSE_SIZE, "CheckMac response must be 32 bytes")?;
            exact(data3, CHECKMAC_OTHER_DATA_SIZE, "CheckMac other data must be 13 bytes")?;
            if param1 & !CHECKMAC_MODE_MASK != 0 {
                return Err(BadParameter("CheckMac mode has reserved bits set"));
            }
            key_id(param2)
        }

        Opcode::DeriveKey => {
            optional(data1, DERIVE_KEY_MAC_SIZE, "DeriveKey MAC must be 32 bytes")?;
            unused(data2, data3)?;
            if param1 & !DERIVE_KEY_RANDOM_FLAG != 0 {
                return Err(BadParameter("DeriveKey only accepts the random flag"));
            }
            key_id(param2)
        }

        Opcode::GenDig => {
            optional(data1, GENDIG_OTHER_DATA_SIZE, "GenDig other data must be 4 bytes")?;
            unused(data2, data3)?;
            match param1 {
                GENDIG_ZONE_OTP if param2 > OTP_BLOCK_MAX => {
                    Err(BadParameter("GenDig OTP block out of range"))
                }
                GENDIG_ZONE_DATA => key_id(param2),
                GENDIG_ZONE_OTP => Ok(()),
                _ => Err(BadParameter("GenDig zone must be OTP or Data")),
            }
        }

        Opcode::Hmac => {
            none(command)?;
            if param1 & !HMAC_MODE_MASK != 0 {
                return Err(BadParameter("HMAC mode has reserved bits set"));
            }
            // Only key ids 0..=15 exist, but all 16 bits enter the HMAC message.
            Ok(())
        }

        Opcode::Lock => {
            none(command)?;
            if param1 & !LOCK_ZONE_MASK != 0 {
                return Err(BadParameter("Lock zone has reserved bits set"));
            }
            if param1 & LOCK_ZONE_NO_CRC != 0 && param2 != 0 {
                return Err(BadParameter("Lock summary must be 0 when the CRC check is skipped"));
            }
            Ok(())
        }

        Opcode::Mac => {
            if param1 & !MAC_MODE_MASK != 0 {
                return Err(BadParameter("MAC mode has reserved bits set"));
            }
            if param1 & MAC_MODE_BLOCK2_TEMPKEY == 0 {
                exact(data1, MAC_CHALLENGE_SIZE, "MAC challenge must be 32 bytes")?;
            } else if !data1.is_empty() {
                return Err(BadParameter("MAC takes no challenge in TempKey mode"));
            }
            unused(data2, data3)
        }

        Opcode::Nonce => {
            if param1 > NONCE_MODE_PASSTHROUGH || param1 == NONCE_MODE_INVALID {
                return Err(BadParameter("invalid Nonce mode"));
            }
            if param1 == NONCE_MODE_PASSTHROUGH {
                exact(data1, NONCE_NUMIN_SIZE_PASSTHROUGH, "pass-through Nonce input must be 32 bytes")?;
            } else {
                exact(data1, NONCE_NUMIN_SIZE, "Nonce input must be 20 bytes")?;
            }
            unused(data2, data3)
        }

        Opcode::Random => {
            none(command)?;
            if param1 > RANDOM_NO_SEED_UPDATE {
                return Err(BadParameter("invalid Random mode"));
            }
            Ok(())
        }

        Opcode::Read => {
            none(command)?;
            if param1 & !READ_ZONE_MASK != 0 {
                return Err(BadParameter("Read zone has reserved bits set"));
            }
            if param1 & READ_ZONE_MODE_32_BYTES != 0 && param1 & ZONE_MASK == ZONE_OTP {
                return Err(BadParameter("32-byte reads are not allowed in the OTP zone"));
            }
            data_zone_address(param1, param2)
        }

        Opcode::UpdateExtra => {
            none(command)?;
            if param1 > UPDATE_CONFIG_BYTE_86 {
                return Err(BadParameter("invalid UpdateExtra mode"));
            }
            Ok(())
        }

        Opcode::Write => {
            if param1 & !WRITE_ZONE_MASK != 0 {
                return Err(BadParameter("Write zone has reserved bits set"));
            }
            if param1 & ZONE_COUNT_FLAG != 0 {
                exact(data1, ZONE_ACCESS_32, "32-byte Write needs 32 bytes of data")?;
            } else {
                exact(data1, ZONE_ACCESS_4, "4-byte Write needs 4 bytes of data")?;
            }
            optional(data2, WRITE_MAC_SIZE, "Write MAC must be 32 bytes")?;
            if !data3.is_empty() {
                return Err(BadParameter("Write takes at most two data blocks"));
            }
            data_zone_address(param1, param2)
        }

        Opcode::DevRev | Opcode::Pause | Opcode::TempSense => none(command),
    }
}

fn key_id(param2: u16) -> Result<(), BadParameter> {
    if param2 > KEY_ID_MAX {
        return Err(BadParameter("key id out of range"));
    }
    Ok(())
}

/// Data zone addresses are byte addresses. A word address with its low bit
/// set would be silently masked by the device into a different word.
fn data_zone_address(zone: u8, address: u16) -> Result<(), BadParameter> {
    if zone & ZONE_DATA != 0 && word_address(zone, address) & 1 != 0 {
        return Err(BadParameter("data zone address is not on an even word"));
    }
    Ok(())
}

fn exact(block: &[u8], size: usize, reason: &'static str) -> Result<(), BadParameter> {
    if block.len() != size {
        return Err(BadParameter(reason));
    }
    Ok(())
}

fn optional(block: &[u8], size: usize, reason: &'static str) -> Result<(), BadParameter> {
    if block.is_empty() {
        return Ok(());
    }
    exact(block, size, reason)
}

fn unused(data2: &[u8], data3: &[u8]) -> Result<(), BadParameter> {
    if !data2.is_empty() || !data3.is_empty() {
        return Err(BadParameter("unexpected data block"));
    }
    Ok(())
}

fn none(command: &Command<'_>) -> Result<(), BadParameter> {
    if command.data_len() != 0 {
        return Err(BadParameter("command takes no data"));
    }
    Ok(())
}
