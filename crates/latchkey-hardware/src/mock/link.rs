//! Mock door-controller link.
//!
//! [`MockLink::new`] returns both halves of a link plus a
//! [`MockLinkHandle`] that plays the part of the microcontroller: it injects
//! frame payloads (or raw wire bytes, which go through the real HDLC parser),
//! injects read errors, closes the link, and captures every frame the
//! gateway sends.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use latchkey_protocol::HdlcCodec;
use tokio_util::codec::Decoder;

use crate::error::{HardwareError, Result};
use crate::traits::{FrameSink, FrameSource, ReadEvent};

const DEFAULT_MOCK_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Internal event type for the mock link.
#[derive(Debug)]
enum LinkEvent {
    Payload(Bytes),
    Wire(Bytes),
    Error(String),
    Close,
}

/// Constructor for mock link halves.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::mock::MockLink;
/// use latchkey_hardware::{FrameSink, FrameSource, ReadEvent};
///
/// let (mut source, mut sink, handle) = MockLink::new();
///
/// handle.send_message(r#"{"message":"rfid_card","rfid":"1234"}"#);
/// assert_eq!(
///     source.read_frame().unwrap(),
///     ReadEvent::Frame(r#"{"message":"rfid_card","rfid":"1234"}"#.into())
/// );
///
/// sink.send_frame(br#"{"message":"lock_ctrl","unlock":true}"#).unwrap();
/// assert_eq!(handle.sent_frames().len(), 1);
/// ```
pub struct MockLink;

impl MockLink {
    /// Create a mock link named `mock`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MockSource, MockSink, MockLinkHandle) {
        Self::with_name("mock")
    }

    /// Create a mock link with a custom device name.
    pub fn with_name(name: impl Into<String>) -> (MockSource, MockSink, MockLinkHandle) {
        let name = name.into();
        let (event_tx, event_rx) = mpsc::channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));

        let source = MockSource {
            name: name.clone(),
            event_rx,
            codec: HdlcCodec::new(),
            buffer: BytesMut::new(),
            read_timeout: DEFAULT_MOCK_READ_TIMEOUT,
        };

        let sink = MockSink {
            name,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };

        let handle = MockLinkHandle {
            event_tx,
            sent,
            closed,
        };

        (source, sink, handle)
    }
}

/// Receiving half of a mock link.
#[derive(Debug)]
pub struct MockSource {
    name: String,
    event_rx: mpsc::Receiver<LinkEvent>,
    codec: HdlcCodec,
    buffer: BytesMut,
    read_timeout: Duration,
}

impl MockSource {
    /// Set how long `read_frame` waits before reporting `Idle`.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl FrameSource for MockSource {
    fn read_frame(&mut self) -> Result<ReadEvent> {
        if let Some(frame) = self.codec.decode(&mut self.buffer)? {
            return Ok(ReadEvent::Frame(frame.into_payload()));
        }

        match self.event_rx.recv_timeout(self.read_timeout) {
            Ok(LinkEvent::Payload(payload)) => Ok(ReadEvent::Frame(payload)),
            Ok(LinkEvent::Wire(bytes)) => {
                self.buffer.extend_from_slice(&bytes);
                match self.codec.decode(&mut self.buffer)? {
                    Some(frame) => Ok(ReadEvent::Frame(frame.into_payload())),
                    None => Ok(ReadEvent::Idle),
                }
            }
            Ok(LinkEvent::Error(message)) => Err(HardwareError::communication(message)),
            Ok(LinkEvent::Close) | Err(RecvTimeoutError::Disconnected) => Ok(ReadEvent::Closed),
            Err(RecvTimeoutError::Timeout) => Ok(ReadEvent::Idle),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Sending half of a mock link. Sent payloads are visible through the handle.
#[derive(Debug)]
pub struct MockSink {
    name: String,
    sent: Arc<Mutex<Vec<Bytes>>>,
    closed: Arc<Mutex<bool>>,
}

impl FrameSink for MockSink {
    fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        if *lock(&self.closed) {
            return Err(HardwareError::disconnected(&self.name));
        }
        lock(&self.sent).push(Bytes::copy_from_slice(payload));
        Ok(())
    }

    fn close(&mut self) {
        *lock(&self.closed) = true;
    }
}

/// Handle for driving a mock link.
#[derive(Debug, Clone)]
pub struct MockLinkHandle {
    event_tx: mpsc::Sender<LinkEvent>,
    sent: Arc<Mutex<Vec<Bytes>>>,
    closed: Arc<Mutex<bool>>,
}

impl MockLinkHandle {
    /// Deliver one already-deframed payload.
    pub fn send_payload(&self, payload: impl Into<Bytes>) {
        let _ = self.event_tx.send(LinkEvent::Payload(payload.into()));
    }

    /// Deliver one JSON message as a frame payload.
    pub fn send_message(&self, json: &str) {
        self.send_payload(Bytes::copy_from_slice(json.as_bytes()));
    }

    /// Deliver raw wire bytes; they are parsed by the HDLC decoder.
    pub fn send_wire(&self, bytes: impl Into<Bytes>) {
        let _ = self.event_tx.send(LinkEvent::Wire(bytes.into()));
    }

    /// Make the next read fail as if the device vanished.
    pub fn inject_error(&self, message: impl Into<String>) {
        let _ = self.event_tx.send(LinkEvent::Error(message.into()));
    }

    /// Close the link from the controller side.
    pub fn close(&self) {
        let _ = self.event_tx.send(LinkEvent::Close);
    }

    /// Payloads the gateway has sent, oldest first.
    pub fn sent_frames(&self) -> Vec<Bytes> {
        lock(&self.sent).clone()
    }

    /// Whether the gateway closed its sending half.
    pub fn is_sink_closed(&self) -> bool {
        *lock(&self.closed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_protocol::Frame;

    #[test]
    fn test_payload_delivery() {
        let (mut source, _sink, handle) = MockLink::new();

        handle.send_message(r#"{"message":"status"}"#);

        assert_eq!(
            source.read_frame().unwrap(),
            ReadEvent::Frame(Bytes::from_static(br#"{"message":"status"}"#))
        );
    }

    #[test]
    fn test_idle_when_nothing_sent() {
        let (mut source, _sink, _handle) = MockLink::new();
        assert_eq!(source.read_frame().unwrap(), ReadEvent::Idle);
    }

    #[test]
    fn test_wire_bytes_go_through_parser() {
        let (mut source, _sink, handle) = MockLink::new();

        let mut wire = Frame::new(&b"one"[..]).to_wire().unwrap().to_vec();
        wire.extend_from_slice(&Frame::new(&b"two"[..]).to_wire().unwrap());
        handle.send_wire(wire);

        assert_eq!(
            source.read_frame().unwrap(),
            ReadEvent::Frame(Bytes::from_static(b"one"))
        );
        // Second frame was already parsed from the same chunk
        assert_eq!(
            source.read_frame().unwrap(),
            ReadEvent::Frame(Bytes::from_static(b"two"))
        );
    }

    #[test]
    fn test_partial_wire_reports_idle() {
        let (mut source, _sink, handle) = MockLink::new();
        let wire = Frame::new(&b"split"[..]).to_wire().unwrap();

        handle.send_wire(wire.slice(..3));
        assert_eq!(source.read_frame().unwrap(), ReadEvent::Idle);

        handle.send_wire(wire.slice(3..));
        assert_eq!(
            source.read_frame().unwrap(),
            ReadEvent::Frame(Bytes::from_static(b"split"))
        );
    }

    #[test]
    fn test_injected_error() {
        let (mut source, _sink, handle) = MockLink::new();
        handle.inject_error("unplugged");

        let err = source.read_frame().unwrap_err();
        assert!(matches!(err, HardwareError::CommunicationError { .. }));
    }

    #[test]
    fn test_close_and_dropped_handle() {
        let (mut source, _sink, handle) = MockLink::new();
        handle.close();
        assert_eq!(source.read_frame().unwrap(), ReadEvent::Closed);

        let (mut source, _sink, handle) = MockLink::new();
        drop(handle);
        assert_eq!(source.read_frame().unwrap(), ReadEvent::Closed);
    }

    #[test]
    fn test_sink_captures_and_closes() {
        let (_source, mut sink, handle) = MockLink::new();

        sink.send_frame(b"cmd").unwrap();
        assert_eq!(handle.sent_frames(), vec![Bytes::from_static(b"cmd")]);

        sink.close();
        assert!(handle.is_sink_closed());
        assert!(matches!(
            sink.send_frame(b"cmd"),
            Err(HardwareError::Disconnected { .. })
        ));
    }
}
