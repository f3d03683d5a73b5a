//! I2C link for ESP32 using esp-idf-hal

use crate::transport::Link;
use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{InputPin, OutputPin};
use esp_idf_hal::i2c::{self, I2cConfig, I2cDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::{EspError, ESP_FAIL};

/// Default 7-bit bus address of the device
pub const DEFAULT_ADDRESS: u8 = 0x64;

/// Word address that marks an I2C write as a command frame
const WORD_ADDRESS_COMMAND: u8 = 0x03;

pub struct I2cLink<'a> {
    i2c: I2cDriver<'a>,
    address: u8,
}

impl<'a> I2cLink<'a> {
    pub fn new(
        i2c: impl Peripheral<P = impl i2c::I2c> + 'a,
        sda: impl Peripheral<P = impl InputPin + OutputPin> + 'a,
        scl: impl Peripheral<P = impl InputPin + OutputPin> + 'a,
        address: u8,
        baud_rate: u32,
    ) -> Result<Self, EspError> {
        let config = I2cConfig::new().baudrate(Hertz(baud_rate));
        let i2c = I2cDriver::new(i2c, sda, scl, &config)?;

        Ok(Self { i2c, address })
    }
}

impl Link for I2cLink<'_> {
    type Error = EspError;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut packet = Vec::with_capacity(data.len() + 1);
        packet.push(WORD_ADDRESS_COMMAND);
        packet.extend_from_slice(data);
        self.i2c
            .write(self.address, &packet, TickType::new_millis(20).ticks())?;
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        let result = self
            .i2c
            .read(self.address, buf, TickType::new_millis(timeout_ms as u64).ticks());
        nack_as_not_ready(result, buf.len())
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The device NACKs its address while a command is still executing. The
/// driver reports that as `ESP_FAIL`; any other code is a bus fault.
fn nack_as_not_ready(result: Result<(), EspError>, len: usize) -> Result<usize, EspError> {
    match result {
        Ok(()) => Ok(len),
        Err(e) if e.code() == ESP_FAIL => Ok(0),
        Err(e) => Err(e),
    }
}
