//! Tokio codec for HDLC framing.
//!
//! `HdlcCodec` wraps the [`StreamParser`] so the framing can be used with
//! `tokio_util::codec::{FramedRead, FramedWrite}` or driven by hand from a
//! blocking serial reader:
//!
//! ```text
//! serial bytes -> Decoder -> Frame (CRC checked)
//! Frame -> Encoder -> serial bytes (flags, stuffing, CRC)
//! ```
//!
//! # Usage with a blocking reader
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use latchkey_protocol::{Frame, HdlcCodec};
//!
//! let mut codec = HdlcCodec::new();
//! let mut buf = BytesMut::from(&Frame::new(&b"hi"[..]).to_wire().unwrap()[..]);
//!
//! let frame = codec.decode(&mut buf).unwrap().unwrap();
//! assert_eq!(frame.payload(), b"hi");
//! ```
//!
//! Corrupt frames never surface as decode errors: line noise on a serial
//! link is expected, so the parser drops them and keeps going.

use bytes::{Bytes, BytesMut};
use latchkey_core::{Error, Result};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Frame, StreamParser};

/// Tokio codec for HDLC frames.
#[derive(Debug, Default)]
pub struct HdlcCodec {
    parser: StreamParser,
}

impl HdlcCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self {
            parser: StreamParser::new(),
        }
    }

    /// Frames discarded by the underlying parser.
    pub fn frames_dropped(&self) -> u64 {
        self.parser.frames_dropped()
    }
}

impl Decoder for HdlcCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            // All bytes are now owned by the parser's frame buffer.
            self.parser.feed(src);
            src.clear();
        }

        Ok(self.parser.next_frame())
    }
}

impl Encoder<Frame> for HdlcCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        item.encode(dst)
    }
}

impl Encoder<Bytes> for HdlcCodec {
    type Error = Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        Frame::new(item).encode(dst)
    }
}
