//! Command marshaling layer for the ATSHA204 crypto authentication device.
//!
//! Validates logical commands against the device's per-opcode rules, frames
//! them with the trailing CRC and hands them to a [`Transport`]. Transport
//! errors come back unchanged.
//!
//! # Features
//!
//! - `serial` - Serial port link for desktop using serialport crate
//! - `i2c-esp32` - I2C link for ESP32 using esp-idf-hal
//!
//! # Example
//!
//! ```ignore
//! use sha204::{PollingTransport, SerialTransport, Sha204};
//!
//! let link = SerialTransport::new("/dev/ttyUSB0", 115200)?;
//! let mut device = Sha204::new(PollingTransport::new(link));
//!
//! let random = device.random(sha204::layout::RANDOM_SEED_UPDATE)?;
//! println!("Random: {:02X?}", random);
//! ```

mod checksum;
mod device;
mod frame;
pub mod layout;
pub mod response;
mod transport;
mod types;
mod validate;

#[cfg(feature = "i2c-esp32")]
mod i2c;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use device::Sha204;
pub use frame::encode;
pub use response::DeviceStatus;
pub use transport::{Link, PollingTransport, Transport, TransportError};
pub use types::{BadParameter, Command, Config, Opcode, Sha204Error};

#[cfg(feature = "i2c-esp32")]
pub use i2c::{I2cLink, DEFAULT_ADDRESS};

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
