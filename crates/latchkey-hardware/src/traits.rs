//! Link trait definitions.
//!
//! The serial link is split into a receiving half and a sending half so the
//! blocking reader thread can own one while the decision engine owns the
//! other. Both halves are synchronous: the reader runs on a dedicated
//! blocking thread, and a write is a handful of bytes that completes well
//! within the serial driver's buffer.

use bytes::Bytes;

use crate::error::Result;

/// Outcome of one read attempt on a [`FrameSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// A complete frame passed the CRC check; this is its payload.
    Frame(Bytes),

    /// The read timeout elapsed without completing a frame.
    Idle,

    /// The link was closed from the other end.
    Closed,
}

/// Receiving half of a frame link.
///
/// `read_frame` blocks for at most the configured read timeout, so callers
/// can poll a stop flag between calls.
///
/// # Examples
///
/// ```no_run
/// use latchkey_hardware::{FrameSource, ReadEvent, Result};
///
/// fn next_payload<S: FrameSource>(source: &mut S) -> Result<Option<Vec<u8>>> {
///     loop {
///         match source.read_frame()? {
///             ReadEvent::Frame(payload) => return Ok(Some(payload.to_vec())),
///             ReadEvent::Idle => continue,
///             ReadEvent::Closed => return Ok(None),
///         }
///     }
/// }
/// ```
pub trait FrameSource: Send + 'static {
    /// Wait for the next complete frame.
    ///
    /// # Errors
    ///
    /// Any error means the link is unusable.
    fn read_frame(&mut self) -> Result<ReadEvent>;

    /// Device name for logs.
    fn name(&self) -> &str;
}

/// Sending half of a frame link.
pub trait FrameSink: Send + 'static {
    /// Frame `payload` and write it to the link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the write fails.
    fn send_frame(&mut self, payload: &[u8]) -> Result<()>;

    /// Release the device. Further sends fail with `Disconnected`.
    fn close(&mut self);
}
