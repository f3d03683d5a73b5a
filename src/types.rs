//! Types shared by the validator, the assembler and the driver

use std::fmt::Debug;

use thiserror::Error;

/// Command op-codes understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Pause = 0x01,
    Read = 0x02,
    Mac = 0x08,
    Hmac = 0x11,
    Write = 0x12,
    GenDig = 0x15,
    Nonce = 0x16,
    Lock = 0x17,
    TempSense = 0x18,
    Random = 0x1B,
    DeriveKey = 0x1C,
    UpdateExtra = 0x20,
    CheckMac = 0x28,
    DevRev = 0x30,
}

impl TryFrom<u8> for Opcode {
    type Error = BadParameter;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Opcode::Pause),
            0x02 => Ok(Opcode::Read),
            0x08 => Ok(Opcode::Mac),
            0x11 => Ok(Opcode::Hmac),
            0x12 => Ok(Opcode::Write),
            0x15 => Ok(Opcode::GenDig),
            0x16 => Ok(Opcode::Nonce),
            0x17 => Ok(Opcode::Lock),
            0x18 => Ok(Opcode::TempSense),
            0x1B => Ok(Opcode::Random),
            0x1C => Ok(Opcode::DeriveKey),
            0x20 => Ok(Opcode::UpdateExtra),
            0x28 => Ok(Opcode::CheckMac),
            0x30 => Ok(Opcode::DevRev),
            _ => Err(BadParameter("unknown op-code")),
        }
    }
}

/// A logical command request: op-code, two parameters and up to three data blocks.
///
/// Empty blocks are skipped when the frame is assembled. The descriptor only
/// borrows its data, so it is cheap to build one per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Command<'a> {
    pub opcode: u8,
    pub param1: u8,
    pub param2: u16,
    pub data1: &'a [u8],
    pub data2: &'a [u8],
    pub data3: &'a [u8],
}

impl<'a> Command<'a> {
    pub fn new(opcode: u8, param1: u8, param2: u16) -> Self {
        Self {
            opcode,
            param1,
            param2,
            ..Self::default()
        }
    }

    pub fn with_data1(mut self, data: &'a [u8]) -> Self {
        self.data1 = data;
        self
    }

    pub fn with_data2(mut self, data: &'a [u8]) -> Self {
        self.data2 = data;
        self
    }

    pub fn with_data3(mut self, data: &'a [u8]) -> Self {
        self.data3 = data;
        self
    }

    /// Total number of data bytes carried by the three blocks
    pub fn data_len(&self) -> usize {
        self.data1.len() + self.data2.len() + self.data3.len()
    }

    /// Value of the frame's count byte: count, op-code, param1, param2, data and checksum
    pub fn frame_len(&self) -> usize {
        crate::layout::CMD_SIZE_MIN + self.data_len()
    }
}

/// Driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Run the per-opcode parameter rules before a command is assembled.
    ///
    /// Buffer capacity and op-code checks run regardless of this flag.
    pub check_parameters: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_parameters: true,
        }
    }
}

/// A command was rejected locally; nothing was transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bad parameter: {0}")]
pub struct BadParameter(pub &'static str);

/// Errors returned by [`crate::Sha204`] operations
#[derive(Debug, Error)]
pub enum Sha204Error<E: Debug> {
    /// Validation failed before any byte left the host
    #[error(transparent)]
    BadParameter(#[from] BadParameter),
    /// Error reported by the transport, passed through unchanged
    #[error("transport error: {0:?}")]
    Transport(E),
}

impl<E: Debug> Sha204Error<E> {
    pub fn is_bad_parameter(&self) -> bool {
        matches!(self, Sha204Error::BadParameter(_))
    }
}
