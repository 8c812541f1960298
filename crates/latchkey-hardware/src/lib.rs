//! Link to the door controller for the Latchkey gateway.
//!
//! The gateway talks to a microcontroller over a serial line carrying
//! HDLC-framed JSON. This crate hides the device behind two small traits so
//! the event bridge can run against real hardware or a mock:
//!
//! - [`FrameSource`]: blocking, timeout-bounded read of the next frame.
//! - [`FrameSink`]: frame and write a command.
//!
//! [`serial::open`] opens a real device and returns both halves;
//! [`mock::MockLink`] returns in-memory halves plus a handle for tests.
//!
//! ```no_run
//! use latchkey_hardware::serial::{self, SerialConfig};
//! use latchkey_hardware::{FrameSink, FrameSource, ReadEvent};
//!
//! # fn main() -> latchkey_hardware::Result<()> {
//! let (mut reader, mut writer) = serial::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//!
//! if let ReadEvent::Frame(payload) = reader.read_frame()? {
//!     println!("{}", String::from_utf8_lossy(&payload));
//! }
//! writer.send_frame(br#"{"message":"lock_ctrl","unlock":true}"#)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::{HardwareError, Result};
pub use serial::{SerialConfig, SerialReader, SerialWriter};
pub use traits::{FrameSink, FrameSource, ReadEvent};
