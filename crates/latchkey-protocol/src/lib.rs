//! Wire protocol between the gateway and the door controller.
//!
//! Two layers:
//!
//! - [`Frame`], [`StreamParser`] and [`HdlcCodec`] implement the HDLC-style
//!   byte framing (flag delimiting, byte stuffing, CRC-16 trailer).
//! - [`message`] turns frame payloads into [`InboundMessage`] values and
//!   [`OutboundMessage`] commands into payloads.
//!
//! [`InboundMessage`]: latchkey_core::InboundMessage
//! [`OutboundMessage`]: latchkey_core::OutboundMessage

pub mod codec;
pub mod frame;
pub mod message;
pub mod stream_parser;

pub use codec::HdlcCodec;
pub use frame::{Frame, crc16};
pub use message::{decode_inbound, encode_outbound};
pub use stream_parser::{DrainFrames, ParserState, StreamParser};
