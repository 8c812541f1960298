//! Serial port link to the door controller.
//!
//! Opens the device at 8N1 with a short read timeout and splits it into a
//! [`SerialReader`] and a [`SerialWriter`] sharing the same port via
//! `try_clone`.

use std::io::{self, Read, Write};
use std::time::Duration;

use bytes::BytesMut;
use latchkey_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SERIAL_PORT};
use latchkey_protocol::{Frame, HdlcCodec};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio_util::codec::Decoder;
use tracing::{debug, info, trace};

use crate::error::{HardwareError, Result};
use crate::traits::{FrameSink, FrameSource, ReadEvent};

const READ_CHUNK_SIZE: usize = 256;

/// Serial device settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub port: String,

    /// Line speed.
    pub baud_rate: u32,

    /// Upper bound for one blocking read.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        }
    }
}

impl SerialConfig {
    /// Settings for `port` with default line parameters.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Open the serial device and split it into reader and writer halves.
///
/// # Errors
///
/// Returns `HardwareError::OpenFailed` if the device cannot be opened or
/// cloned.
pub fn open(config: &SerialConfig) -> Result<(SerialReader, SerialWriter)> {
    let port = serialport::new(&config.port, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|e| HardwareError::open_failed(&config.port, e.to_string()))?;

    let writer_port = port
        .try_clone()
        .map_err(|e| HardwareError::open_failed(&config.port, e.to_string()))?;

    info!(
        port = %config.port,
        baud_rate = config.baud_rate,
        "Serial link opened"
    );

    Ok((
        SerialReader::new(config.port.clone(), port),
        SerialWriter::new(config.port.clone(), writer_port),
    ))
}

/// Receiving half of the serial link.
pub struct SerialReader {
    name: String,
    port: Box<dyn SerialPort>,
    codec: HdlcCodec,
    buffer: BytesMut,
}

impl SerialReader {
    fn new(name: String, port: Box<dyn SerialPort>) -> Self {
        Self {
            name,
            port,
            codec: HdlcCodec::new(),
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Frames dropped by the parser for bad CRC or overflow.
    pub fn frames_dropped(&self) -> u64 {
        self.codec.frames_dropped()
    }
}

impl FrameSource for SerialReader {
    fn read_frame(&mut self) -> Result<ReadEvent> {
        // One read can complete several frames; hand out queued ones first.
        if let Some(frame) = self.codec.decode(&mut self.buffer)? {
            return Ok(ReadEvent::Frame(frame.into_payload()));
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.port.read(&mut chunk) {
            Ok(0) => Ok(ReadEvent::Idle),
            Ok(n) => {
                trace!(port = %self.name, bytes = n, "Serial bytes received");
                self.buffer.extend_from_slice(&chunk[..n]);
                match self.codec.decode(&mut self.buffer)? {
                    Some(frame) => Ok(ReadEvent::Frame(frame.into_payload())),
                    None => Ok(ReadEvent::Idle),
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(ReadEvent::Idle),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(ReadEvent::Idle),
            Err(e) if is_disconnect(&e) => Err(HardwareError::disconnected(&self.name)),
            Err(e) => Err(HardwareError::Io(e)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Sending half of the serial link.
pub struct SerialWriter {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    buffer: BytesMut,
}

impl SerialWriter {
    fn new(name: String, port: Box<dyn SerialPort>) -> Self {
        Self {
            name,
            port: Some(port),
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }
}

impl FrameSink for SerialWriter {
    fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(&self.name))?;

        self.buffer.clear();
        Frame::new(payload.to_vec()).encode(&mut self.buffer)?;

        port.write_all(&self.buffer)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.name, "Serial writer closed");
        }
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_config_builder() {
        let config = SerialConfig::new("/dev/ttyACM0")
            .with_baud_rate(115_200)
            .with_read_timeout(Duration::from_millis(20));

        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout, Duration::from_millis(20));
    }

    #[test]
    fn test_open_missing_device_fails() {
        let config = SerialConfig::new("/dev/latchkey-does-not-exist");
        let result = open(&config);
        assert!(matches!(result, Err(HardwareError::OpenFailed { .. })));
    }

    #[test]
    fn test_disconnect_kinds() {
        assert!(is_disconnect(&io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::TimedOut)));
    }
}
