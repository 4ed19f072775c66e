//! Serial reader input with Wiegand pulse decoding.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use fobreader_core::Credential;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{info, trace};

use super::InputSource;
use super::wiegand::WiegandDecoder;
use crate::error::{HardwareError, Result};

/// Non-blocking source of raw bytes.
pub trait ByteTransport: Send {
    /// Return every byte currently buffered, possibly none. Never waits for more.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails; a timeout is an empty read.
    fn read_available(&mut self) -> Result<Vec<u8>>;
}

impl ByteTransport for Box<dyn SerialPort> {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        let available = self.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0; available];
        match self.read(&mut buf) {
            Ok(read) => {
                buf.truncate(read);
                Ok(buf)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Open the reader's serial port at 8N1.
///
/// # Errors
///
/// Returns `HardwareError::InitializationFailed` if the port cannot be opened.
pub fn open_serial(path: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(|e| {
            HardwareError::initialization_failed(format!("Cannot open serial port {path}: {e}"))
        })?;

    info!("Opened serial port {} at {} baud", path, baud_rate);
    Ok(port)
}

/// Physical reader input: Wiegand decoder first, serial bytes as fallback.
pub struct SerialWiegandSource {
    transport: Box<dyn ByteTransport>,
    decoder: Option<Box<dyn WiegandDecoder>>,
}

impl SerialWiegandSource {
    pub fn new(
        transport: Box<dyn ByteTransport>,
        decoder: Option<Box<dyn WiegandDecoder>>,
    ) -> Self {
        Self { transport, decoder }
    }

    pub fn has_decoder(&self) -> bool {
        self.decoder.is_some()
    }

    fn read_now(&mut self) -> Result<Credential> {
        if let Some(decoded) = self.decoder.as_mut().and_then(|d| d.read()) {
            if !decoded.is_empty() {
                log_raw_input(&decoded);
                return Ok(Credential::new(decoded));
            }
        }

        let bytes = self.transport.read_available()?;
        if bytes.is_empty() {
            trace!("No serial input this poll");
            return Ok(Credential::empty());
        }

        let raw = String::from_utf8_lossy(&bytes).into_owned();
        log_raw_input(&raw);
        Ok(Credential::new(raw))
    }
}

impl std::fmt::Debug for SerialWiegandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialWiegandSource")
            .field("has_decoder", &self.has_decoder())
            .finish_non_exhaustive()
    }
}

impl InputSource for SerialWiegandSource {
    async fn read(&mut self) -> Result<Credential> {
        self.read_now()
    }
}

fn log_raw_input(raw: &str) {
    info!("Received raw input [{}]: {}", raw.len(), raw.escape_debug());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSerialTransport, MockWiegandDecoder};

    #[tokio::test]
    async fn test_decoder_wins_over_raw_bytes() {
        let (transport, serial) = MockSerialTransport::new();
        let (decoder, wiegand) = MockWiegandDecoder::new();
        let mut source = SerialWiegandSource::new(Box::new(transport), Some(Box::new(decoder)));

        serial.push(b"RAW");
        wiegand.push("0012345678");

        assert_eq!(source.read().await.unwrap().as_str(), "0012345678");
        assert_eq!(source.read().await.unwrap().as_str(), "RAW");
        assert!(source.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_decoder_result_falls_back() {
        let (transport, serial) = MockSerialTransport::new();
        let (decoder, wiegand) = MockWiegandDecoder::new();
        let mut source = SerialWiegandSource::new(Box::new(transport), Some(Box::new(decoder)));

        wiegand.push("");
        serial.push(b"7");

        assert_eq!(source.read().await.unwrap().as_str(), "7");
    }

    #[tokio::test]
    async fn test_raw_only_without_decoder() {
        let (transport, serial) = MockSerialTransport::new();
        let mut source = SerialWiegandSource::new(Box::new(transport), None);

        assert!(source.read().await.unwrap().is_empty());
        serial.push(b"\x02ABC\x03");
        assert_eq!(source.read().await.unwrap().as_str(), "\u{2}ABC\u{3}");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let (transport, serial) = MockSerialTransport::new();
        let mut source = SerialWiegandSource::new(Box::new(transport), None);

        serial.push(&[b'1', 0xFF, b'2']);
        assert_eq!(source.read().await.unwrap().as_str(), "1\u{FFFD}2");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let (transport, serial) = MockSerialTransport::new();
        let mut source = SerialWiegandSource::new(Box::new(transport), None);

        serial.fail_next_read();
        assert!(source.read().await.is_err());
        assert!(source.read().await.unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_port_is_startup_failure() {
        let error = open_serial("/dev/does-not-exist-fobreader", 9600, Duration::from_millis(10))
            .unwrap_err();
        assert!(error.is_startup_failure());
    }
}
