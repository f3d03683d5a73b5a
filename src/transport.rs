use std::fmt::Debug;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use thiserror::Error;

use crate::checksum;
use crate::layout::{COUNT_IDX, RSP_SIZE_MIN};
use crate::response::{self, DeviceStatus};

/// Command-level transport: sends one frame and collects its response.
///
/// Implementations own timing and retries. The driver calls this once per
/// command and returns the result unchanged.
pub trait Transport {
    /// Error type for transport operations
    type Error: Debug;

    /// Transmit `tx` as-is, wait at least `poll_delay`, then poll for up to
    /// `poll_timeout` until a response of `response_size` bytes has been
    /// written to the start of `rx`.
    fn send_and_receive(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        response_size: usize,
        poll_delay: Duration,
        poll_timeout: Duration,
    ) -> Result<(), Self::Error>;
}

/// Trait for byte-level communication backends.
/// Implement this trait for different buses (serial port, I2C, etc.)
pub trait Link {
    /// Error type for link operations
    type Error: Debug;

    /// Write data to the link
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read data from the link with a timeout in milliseconds.
    /// Returns 0 when the device has nothing to send yet.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Clear the input buffer
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}

/// Errors reported by [`PollingTransport`]
#[derive(Debug, Error)]
pub enum TransportError<E: Debug> {
    #[error("link error: {0:?}")]
    Link(E),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("response checksum mismatch")]
    Checksum,
    #[error("malformed response: {0}")]
    Malformed(&'static str),
    #[error("device reported {0:?}")]
    Device(DeviceStatus),
}

/// [`Transport`] that polls a [`Link`] for the response
pub struct PollingTransport<L: Link> {
    link: L,
    poll_interval: Duration,
}

impl<L: Link> PollingTransport<L> {
    const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

    pub fn new(link: L) -> Self {
        Self {
            link,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the read timeout used for each poll attempt
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Read until the advertised count of bytes has arrived or `timeout` runs out
    fn poll(
        &mut self,
        rx: &mut [u8],
        response_size: usize,
        timeout: Duration,
    ) -> Result<usize, TransportError<L::Error>> {
        let start = Instant::now();
        let timeout_ms = self.poll_interval.as_millis().min(u32::MAX as u128) as u32;
        let mut received = 0;

        loop {
            let wanted = if received > COUNT_IDX {
                rx[COUNT_IDX] as usize
            } else {
                response_size
            };

            let bytes_read = self
                .link
                .read(&mut rx[received..wanted], timeout_ms)
                .map_err(TransportError::Link)?;

            if bytes_read > 0 {
                received += bytes_read;
                trace!("Polled {} bytes, {} total", bytes_read, received);

                let count = rx[COUNT_IDX] as usize;
                if !(RSP_SIZE_MIN..=response_size).contains(&count) {
                    return Err(TransportError::Malformed("count byte out of range"));
                }
                if received >= count {
                    return Ok(count);
                }
            } else if start.elapsed() > timeout {
                return Err(TransportError::Timeout(timeout));
            } else {
                std::thread::sleep(self.poll_interval);
            }
        }
    }
}

impl<L: Link> Transport for PollingTransport<L> {
    type Error = TransportError<L::Error>;

    fn send_and_receive(
        &mut self,
        tx: &[u8],
        rx: &mut [u8],
        response_size: usize,
        poll_delay: Duration,
        poll_timeout: Duration,
    ) -> Result<(), Self::Error> {
        if response_size < RSP_SIZE_MIN || rx.len() < response_size {
            return Err(TransportError::Malformed("response buffer too small"));
        }

        self.link.clear_input().map_err(TransportError::Link)?;
        let written = self.link.write(tx).map_err(TransportError::Link)?;
        debug!("Wrote {} bytes", written);
        std::thread::sleep(poll_delay);

        let count = self.poll(rx, response_size, poll_timeout)?;
        let frame = &rx[..count];

        if !checksum::verify(frame) {
            warn!("Response checksum mismatch: {:02X?}", frame);
            return Err(TransportError::Checksum);
        }

        match response::status(frame) {
            Some(DeviceStatus::Success) | None => {}
            Some(status) => return Err(TransportError::Device(status)),
        }

        if count != response_size {
            return Err(TransportError::Malformed("unexpected response length"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Mock link that hands out queued chunks, one per read
    struct MockLink {
        chunks: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        fail_reads: bool,
    }

    impl MockLink {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
                written: Vec::new(),
                fail_reads: false,
            }
        }
    }

    impl Link for MockLink {
        type Error = std::io::Error;

        fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
            self.written.extend_from_slice(data);
            Ok(data.len())
        }

        fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, Self::Error> {
            if self.fail_reads {
                return Err(std::io::Error::other("bus fault"));
            }
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let len = chunk.len().min(buf.len());
                    buf[..len].copy_from_slice(&chunk[..len]);
                    Ok(len)
                }
                None => Ok(0),
            }
        }

        fn clear_input(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn with_crc(body: &[u8]) -> Vec<u8> {
        let mut frame = body.to_vec();
        frame.extend_from_slice(&checksum::calculate(body));
        frame
    }

    fn run(link: MockLink, response_size: usize) -> (Result<(), TransportError<std::io::Error>>, Vec<u8>, MockLink) {
        let mut transport = PollingTransport::new(link).with_poll_interval(Duration::from_millis(1));
        let mut rx = [0u8; 35];
        let result = transport.send_and_receive(
            &[0x07, 0x30, 0x00, 0x00, 0x00, 0x03, 0x5D],
            &mut rx,
            response_size,
            Duration::ZERO,
            Duration::from_millis(20),
        );
        (result, rx.to_vec(), transport.into_inner())
    }

    #[test]
    fn test_response_in_one_read() {
        let response = with_crc(&[0x07, 0x00, 0x02, 0x00, 0x09]);
        let (result, rx, link) = run(MockLink::new(vec![response.clone()]), 7);
        assert!(result.is_ok());
        assert_eq!(&rx[..7], &response[..]);
        assert_eq!(link.written, [0x07, 0x30, 0x00, 0x00, 0x00, 0x03, 0x5D]);
    }

    #[test]
    fn test_response_in_chunks_after_idle_polls() {
        let response = with_crc(&[0x07, 0x00, 0x02, 0x00, 0x09]);
        let chunks = vec![vec![], response[..2].to_vec(), vec![], response[2..].to_vec()];
        let (result, rx, _) = run(MockLink::new(chunks), 7);
        assert!(result.is_ok());
        assert_eq!(&rx[..7], &response[..]);
    }

    #[test]
    fn test_timeout() {
        let (result, _, _) = run(MockLink::new(vec![]), 7);
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[test]
    fn test_bad_checksum() {
        let (result, _, _) = run(MockLink::new(vec![vec![0x07, 0x00, 0x02, 0x00, 0x09, 0x00, 0x00]]), 7);
        assert!(matches!(result, Err(TransportError::Checksum)));
    }

    #[test]
    fn test_device_status_forwarded() {
        let response = with_crc(&[0x04, 0x0F]);
        let (result, _, _) = run(MockLink::new(vec![response]), 7);
        assert!(matches!(result, Err(TransportError::Device(DeviceStatus::ExecutionError))));
    }

    #[test]
    fn test_short_success_response() {
        let response = with_crc(&[0x04, 0x00]);
        let (result, _, _) = run(MockLink::new(vec![response.clone()]), 4);
        assert!(result.is_ok());

        let (result, _, _) = run(MockLink::new(vec![response]), 35);
        assert!(matches!(result, Err(TransportError::Malformed(_))));
    }

    #[test]
    fn test_count_out_of_range() {
        let (result, _, _) = run(MockLink::new(vec![vec![0x40, 0x00, 0x00]]), 7);
        assert!(matches!(result, Err(TransportError::Malformed(_))));
    }

    #[test]
    fn test_link_error() {
        let mut link = MockLink::new(vec![]);
        link.fail_reads = true;
        let (result, _, _) = run(link, 7);
        assert!(matches!(result, Err(TransportError::Link(_))));
    }
}
