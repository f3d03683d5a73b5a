use log::debug;

use crate::frame;
use crate::layout::*;
use crate::response;
use crate::transport::Transport;
use crate::types::{Command, Config, Opcode, Sha204Error};
use crate::validate;

pub struct Sha204<T: Transport> {
    transport: T,
    config: Config,
    tx: [u8; CMD_SIZE_MAX],
    rx: [u8; RSP_SIZE_MAX],
}

impl<T: Transport> Sha204<T> {
    /// Create a new device instance with the given transport
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, Config::default())
    }

    pub fn with_config(transport: T, config: Config) -> Self {
        Self {
            transport,
            config,
            tx: [0; CMD_SIZE_MAX],
            rx: [0; RSP_SIZE_MAX],
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Validate, assemble and send a command, then receive its response.
    ///
    /// `tx` receives the transmit frame and `rx` the response frame. On
    /// success the response length (count byte included) is returned.
    /// Validation failures return before anything is written to either buffer
    /// or sent; transport errors are returned as the transport reported them.
    pub fn execute(
        &mut self,
        command: &Command<'_>,
        tx: &mut [u8],
        rx: &mut [u8],
    ) -> Result<usize, Sha204Error<T::Error>> {
        dispatch(&mut self.transport, &self.config, command, tx, rx)
    }

    // ========================================================================
    // One method per op-code. Each builds a Command and runs it through the
    // same validation and assembly as `execute`, using the driver's buffers.
    // Successful calls return the response payload.
    // ========================================================================

    /// Compare a MAC computed by another device with the one this device computes
    ///
    /// # Arguments
    /// * `mode` - Selects the hash inputs
    /// * `key_id` - Slot of the key to use (0-15)
    /// * `client_challenge` - Challenge sent to the client; zeros are sent when absent
    /// * `client_response` - Response produced by the client
    /// * `other_data` - 13 bytes of the client's command
    pub fn check_mac(
        &mut self,
        mode: u8,
        key_id: u8,
        client_challenge: Option<&[u8; CHECKMAC_CLIENT_CHALLENGE_SIZE]>,
        client_response: &[u8; CHECKMAC_CLIENT_RESPONSE_SIZE],
        other_data: &[u8; CHECKMAC_OTHER_DATA_SIZE],
    ) -> Result<&[u8], Sha204Error<T::Error>> {
        let zeros = [0u8; CHECKMAC_CLIENT_CHALLENGE_SIZE];
        let command = Command::new(Opcode::CheckMac as u8, mode, key_id.into())
            .with_data1(client_challenge.unwrap_or(&zeros))
            .with_data2(client_response)
            .with_data3(other_data);
        self.run(&command)
    }

    /// Derive a key into `target_key`
    ///
    /// # Arguments
    /// * `random` - 0 or `DERIVE_KEY_RANDOM_FLAG`
    /// * `target_key` - Slot of the key (0-15)
    /// * `mac` - Authorizing MAC, when the slot requires one
    pub fn derive_key(
        &mut self,
        random: u8,
        target_key: u8,
        mac: Option<&[u8; DERIVE_KEY_MAC_SIZE]>,
    ) -> Result<&[u8], Sha204Error<T::Error>> {
        let mut command = Command::new(Opcode::DeriveKey as u8, random, target_key.into());
        if let Some(mac) = mac {
            command = command.with_data1(mac);
        }
        self.run(&command)
    }

    /// Read the device revision (4 bytes)
    pub fn dev_rev(&mut self) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::DevRev as u8, 0, 0))
    }

    /// Generate a digest from a key or OTP block into TempKey
    ///
    /// # Arguments
    /// * `zone` - `GENDIG_ZONE_OTP` or `GENDIG_ZONE_DATA`
    /// * `key_id` - OTP block (0-1) or key slot (0-15)
    /// * `other_data` - 4 bytes, needed for CheckOnly keys
    pub fn gen_dig(
        &mut self,
        zone: u8,
        key_id: u8,
        other_data: Option<&[u8; GENDIG_OTHER_DATA_SIZE]>,
    ) -> Result<&[u8], Sha204Error<T::Error>> {
        let mut command = Command::new(Opcode::GenDig as u8, zone, key_id.into());
        if let Some(other_data) = other_data {
            command = command.with_data1(other_data);
        }
        self.run(&command)
    }

    /// Compute an HMAC over TempKey and device data (32-byte payload)
    pub fn hmac(&mut self, mode: u8, key_id: u16) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::Hmac as u8, mode, key_id))
    }

    /// Lock the configuration or the data/OTP zones
    ///
    /// # Arguments
    /// * `zone` - Zone bits, optionally with `LOCK_ZONE_NO_CRC`
    /// * `summary` - CRC over the zone contents; must be 0 with `LOCK_ZONE_NO_CRC`
    ///
    /// # Warning
    /// Locking is irreversible!
    pub fn lock(&mut self, zone: u8, summary: u16) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::Lock as u8, zone, summary))
    }

    /// Compute a MAC over a key and a challenge (32-byte payload)
    ///
    /// The challenge is ignored when `mode` takes it from TempKey.
    pub fn mac(
        &mut self,
        mode: u8,
        key_id: u16,
        challenge: Option<&[u8; MAC_CHALLENGE_SIZE]>,
    ) -> Result<&[u8], Sha204Error<T::Error>> {
        let mut command = Command::new(Opcode::Mac as u8, mode, key_id);
        if mode & MAC_MODE_BLOCK2_TEMPKEY == 0 {
            if let Some(challenge) = challenge {
                command = command.with_data1(challenge);
            }
        }
        self.run(&command)
    }

    /// Generate a nonce, or load `num_in` into TempKey in pass-through mode
    ///
    /// # Arguments
    /// * `mode` - 0 or 1 with 20 input bytes, `NONCE_MODE_PASSTHROUGH` with 32
    /// * `num_in` - Input bytes
    ///
    /// # Returns
    /// The 32 random bytes, or the status byte in pass-through mode
    pub fn nonce(&mut self, mode: u8, num_in: &[u8]) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::Nonce as u8, mode, 0).with_data1(num_in))
    }

    /// Put every device whose selector differs from `selector` into idle state
    pub fn pause(&mut self, selector: u8) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::Pause as u8, selector, 0))
    }

    /// Get 32 random bytes
    ///
    /// # Arguments
    /// * `mode` - `RANDOM_SEED_UPDATE` or `RANDOM_NO_SEED_UPDATE`
    pub fn random(&mut self, mode: u8) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::Random as u8, mode, 0))
    }

    /// Read 4 or 32 bytes from a zone
    ///
    /// # Arguments
    /// * `zone` - Zone, optionally with `READ_ZONE_MODE_32_BYTES`
    /// * `address` - Byte address in the data zone, word address otherwise
    ///
    /// # Warning
    /// The serialized word address is masked to 7 bits. A data zone byte
    /// address of 0x200 or above wraps to a low word (0x200 reads word 0).
    pub fn read(&mut self, zone: u8, address: u16) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::Read as u8, zone, address))
    }

    /// Read the raw temperature value.
    ///
    /// See [`response::temp_raw`] for the conversion to degrees.
    /// A successful transport call leaves the 7-byte response in the driver's
    /// buffer, so the payload is always present here.
    pub fn temp_sense(&mut self) -> Result<u16, Sha204Error<T::Error>> {
        let command = Command::new(Opcode::TempSense as u8, 0, 0);
        dispatch(&mut self.transport, &self.config, &command, &mut self.tx, &mut self.rx)?;
        let [_, a, b, c, d, ..] = self.rx;
        Ok(response::decode_temp(&[a, b, c, d]))
    }

    /// Update byte 85 or 86 of the configuration zone after it is locked
    pub fn update_extra(&mut self, mode: u8, new_value: u8) -> Result<&[u8], Sha204Error<T::Error>> {
        self.run(&Command::new(Opcode::UpdateExtra as u8, mode, new_value.into()))
    }

    /// Write 4 or 32 bytes to a zone
    ///
    /// # Arguments
    /// * `zone` - Zone, optionally with `ZONE_COUNT_FLAG` and `WRITE_ZONE_WITH_MAC`
    /// * `address` - Byte address in the data zone, word address otherwise
    /// * `value` - 4 bytes, or 32 with `ZONE_COUNT_FLAG`
    /// * `mac` - Authorizing MAC (ignored by the device while the zone is unlocked)
    ///
    /// # Warning
    /// The serialized word address is masked to 7 bits. A data zone byte
    /// address of 0x200 or above wraps to a low word (0x200 writes word 0).
    pub fn write(
        &mut self,
        zone: u8,
        address: u16,
        value: &[u8],
        mac: Option<&[u8; WRITE_MAC_SIZE]>,
    ) -> Result<&[u8], Sha204Error<T::Error>> {
        let mut command = Command::new(Opcode::Write as u8, zone, address).with_data1(value);
        if let Some(mac) = mac {
            command = command.with_data2(mac);
        }
        self.run(&command)
    }

    fn run(&mut self, command: &Command<'_>) -> Result<&[u8], Sha204Error<T::Error>> {
        let len = dispatch(&mut self.transport, &self.config, command, &mut self.tx, &mut self.rx)?;
        Ok(response::payload(&self.rx[..len]))
    }
}

/// Shared pipeline of both entry points: validate, assemble, hand to the transport.
fn dispatch<T: Transport>(
    transport: &mut T,
    config: &Config,
    command: &Command<'_>,
    tx: &mut [u8],
    rx: &mut [u8],
) -> Result<usize, Sha204Error<T::Error>> {
    let opcode = validate::check_command(command, tx.len(), config)?;
    let response_size = opcode.response_size(command.param1);
    validate::check_response_buffer(rx.len(), response_size)?;

    let len = frame::assemble(opcode, command, tx);
    debug!("Sending {:?} command: {:02X?}", opcode, &tx[..len]);

    transport
        .send_and_receive(
            &tx[..len],
            rx,
            response_size,
            opcode.poll_delay(),
            opcode.poll_timeout(),
        )
        .map_err(Sha204Error::Transport)?;

    debug!("Received {} bytes: {:02X?}", response_size, &rx[..response_size]);
    Ok(response_size)
}
