//! Event bridge reader.
//!
//! The reader owns the [`FrameSource`] on a blocking thread. For every frame
//! it decodes the JSON payload, debounces card reads and pushes the message
//! onto an unbounded queue. It never touches the network, so a slow
//! directory call cannot stall the serial link.
//!
//! ```text
//! serial ─> FrameSource ─> decode ─> debounce ─> queue ─> decision engine
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use latchkey_core::InboundMessage;
use latchkey_hardware::{FrameSource, HardwareError, ReadEvent};
use latchkey_protocol::decode_inbound;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::debounce::Debouncer;

/// Why the reader stopped.
#[derive(Debug)]
pub enum ReaderExit {
    /// A stop was requested or the queue was dropped.
    Stopped,

    /// The link was closed from the controller side.
    Closed,

    /// Reading from the link failed.
    Failed(HardwareError),
}

/// Decode a frame payload and apply debouncing.
///
/// Returns the message to enqueue, or `None` if the payload is malformed,
/// names an unknown message kind, or is a card read inside the debounce
/// window.
pub fn route_frame(payload: &[u8], debouncer: &mut Debouncer, now: Instant) -> Option<InboundMessage> {
    let message = match decode_inbound(payload) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Dropping undecodable frame");
            return None;
        }
    };

    if message.is_rfid_card() && !debouncer.accept(now) {
        debug!("Dropping card read inside debounce window");
        return None;
    }

    Some(message)
}

/// Start the reader on a blocking thread.
///
/// The thread checks `stop` between reads, so it exits within one read
/// timeout of a stop request.
pub fn spawn_reader<S: FrameSource>(
    source: S,
    queue: UnboundedSender<InboundMessage>,
    debouncer: Debouncer,
    stop: Arc<AtomicBool>,
) -> JoinHandle<ReaderExit> {
    tokio::task::spawn_blocking(move || read_loop(source, queue, debouncer, &stop))
}

fn read_loop<S: FrameSource>(
    mut source: S,
    queue: UnboundedSender<InboundMessage>,
    mut debouncer: Debouncer,
    stop: &AtomicBool,
) -> ReaderExit {
    info!(device = %source.name(), "Starting serial reader");

    while !stop.load(Ordering::Acquire) {
        match source.read_frame() {
            Ok(ReadEvent::Frame(payload)) => {
                debug!(received = %String::from_utf8_lossy(&payload), "Frame received");

                if let Some(message) = route_frame(&payload, &mut debouncer, Instant::now())
                    && queue.send(message).is_err()
                {
                    return ReaderExit::Stopped;
                }
            }
            Ok(ReadEvent::Idle) => {}
            Ok(ReadEvent::Closed) => {
                error!(device = %source.name(), "Serial link closed");
                return ReaderExit::Closed;
            }
            Err(e) => {
                error!(device = %source.name(), error = %e, "Serial read failed");
                return ReaderExit::Failed(e);
            }
        }
    }

    ReaderExit::Stopped
}
