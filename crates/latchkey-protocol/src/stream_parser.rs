//! Stream parser for HDLC-framed serial data.
//!
//! The serial port delivers bytes in arbitrary chunks. The parser accumulates
//! them, undoes byte stuffing, checks the CRC trailer and queues complete
//! [`Frame`]s.
//!
//! # Framing
//!
//! ```text
//! 0x7E  <stuffed payload> <stuffed CRC lo> <stuffed CRC hi>  0x7E
//! ```
//!
//! A closing flag may double as the opening flag of the next frame, and
//! consecutive flags are treated as idle fill.
//!
//! # Usage
//!
//! ```
//! use latchkey_protocol::{Frame, StreamParser};
//!
//! let wire = Frame::new(&b"{\"message\":\"status\"}"[..]).to_wire().unwrap();
//!
//! let mut parser = StreamParser::new();
//! parser.feed(&wire[..5]);
//! assert!(parser.next_frame().is_none());
//!
//! parser.feed(&wire[5..]);
//! let frame = parser.next_frame().unwrap();
//! assert_eq!(frame.payload(), b"{\"message\":\"status\"}");
//! ```

use std::collections::VecDeque;

use latchkey_core::constants::{ESCAPE_XOR, FRAME_ESCAPE, FRAME_FLAG, MAX_FRAME_SIZE};

use crate::frame::Frame;

/// Initial capacity for frame assembly.
const INITIAL_PAYLOAD_CAPACITY: usize = 256;

/// Recommended initial capacity for the ready-frame queue.
const INITIAL_FRAME_QUEUE_CAPACITY: usize = 4;

/// State machine states for parsing HDLC frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for a flag byte. Anything else is line noise and discarded.
    WaitingFlag,

    /// Inside a frame, collecting bytes until the next flag.
    ReadingFrame,

    /// The previous byte was an escape; the next byte is XORed back.
    Escaping,
}

/// Stateful stream parser for HDLC frames.
///
/// ```text
/// ┌─────────────┐   FLAG    ┌──────────────┐   ESCAPE   ┌──────────┐
/// │ WaitingFlag │──────────>│ ReadingFrame │───────────>│ Escaping │
/// └─────────────┘           └──────────────┘<───────────└──────────┘
///        ^                    │  FLAG: emit frame,  any byte
///        │ overflow           │  stay in ReadingFrame
///        └────────────────────┘
/// ```
///
/// Frames that fail the CRC check or are shorter than the CRC are dropped
/// and counted in [`frames_dropped`](StreamParser::frames_dropped).
#[derive(Debug)]
pub struct StreamParser {
    /// Current state of the parser state machine.
    state: ParserState,

    /// Unstuffed bytes of the frame being assembled (payload + CRC).
    payload: Vec<u8>,

    /// Queue of complete frames ready for extraction.
    frames: VecDeque<Frame>,

    /// Frames discarded for bad CRC, truncation or overflow.
    dropped: u64,
}

impl StreamParser {
    /// Create a new stream parser.
    pub fn new() -> Self {
        Self {
            state: ParserState::WaitingFlag,
            payload: Vec::with_capacity(INITIAL_PAYLOAD_CAPACITY),
            frames: VecDeque::with_capacity(INITIAL_FRAME_QUEUE_CAPACITY),
            dropped: 0,
        }
    }

    /// Feed bytes read from the serial port.
    ///
    /// Any number of frames, including none, may complete during one call.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.step(byte);
        }
    }

    /// Extract next complete frame if available.
    pub fn next_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Returns current parser state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Returns number of frames ready for extraction.
    pub fn frames_available(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames discarded since creation.
    pub fn frames_dropped(&self) -> u64 {
        self.dropped
    }

    /// Clear all internal buffers and reset state.
    pub fn clear(&mut self) {
        self.payload.clear();
        self.frames.clear();
        self.state = ParserState::WaitingFlag;
    }

    /// Returns an iterator that drains all currently available frames.
    pub fn drain_frames(&mut self) -> DrainFrames<'_> {
        DrainFrames { parser: self }
    }

    fn step(&mut self, byte: u8) {
        match self.state {
            ParserState::WaitingFlag => {
                if byte == FRAME_FLAG {
                    self.begin_frame();
                }
            }
            ParserState::ReadingFrame => match byte {
                FRAME_FLAG => self.finish_frame(),
                FRAME_ESCAPE => self.state = ParserState::Escaping,
                _ => self.push(byte),
            },
            ParserState::Escaping => {
                if byte == FRAME_FLAG {
                    // Abort sequence: escape immediately followed by a flag.
                    self.discard_frame();
                    self.begin_frame();
                } else {
                    self.state = ParserState::ReadingFrame;
                    self.push(byte ^ ESCAPE_XOR);
                }
            }
        }
    }

    fn begin_frame(&mut self) {
        self.payload.clear();
        self.state = ParserState::ReadingFrame;
    }

    fn push(&mut self, byte: u8) {
        if self.payload.len() >= MAX_FRAME_SIZE {
            self.discard_frame();
            self.state = ParserState::WaitingFlag;
            return;
        }
        self.payload.push(byte);
    }

    /// A flag arrived inside a frame. Empty frames are idle fill between
    /// back-to-back flags and are skipped silently.
    fn finish_frame(&mut self) {
        if !self.payload.is_empty() {
            match Frame::from_unescaped(&self.payload) {
                Ok(frame) => self.frames.push_back(frame),
                Err(_) => self.dropped += 1,
            }
        }
        self.begin_frame();
    }

    fn discard_frame(&mut self) {
        if !self.payload.is_empty() {
            self.dropped += 1;
        }
        self.payload.clear();
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that drains frames from a [`StreamParser`].
pub struct DrainFrames<'a> {
    parser: &'a mut StreamParser,
}

impl Iterator for DrainFrames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_frame()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.parser.frames_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainFrames<'_> {
    fn len(&self) -> usize {
        self.parser.frames_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::crc16;

    /// Test helper: wire form of a payload.
    fn make_frame(payload: &[u8]) -> Vec<u8> {
        Frame::new(payload.to_vec()).to_wire().unwrap().to_vec()
    }

    #[test]
    fn test_new_parser() {
        let parser = StreamParser::new();
        assert_eq!(parser.state(), ParserState::WaitingFlag);
        assert_eq!(parser.frames_available(), 0);
        assert_eq!(parser.frames_dropped(), 0);
    }

    #[test]
    fn test_complete_frame_single_feed() {
        let mut parser = StreamParser::new();
        parser.feed(&make_frame(b"{\"message\":\"rfid_card\",\"rfid\":\"1234\"}"));

        assert_eq!(parser.frames_available(), 1);
        let frame = parser.next_frame().unwrap();
        assert_eq!(
            frame.to_str().unwrap(),
            "{\"message\":\"rfid_card\",\"rfid\":\"1234\"}"
        );
    }

    #[test]
    fn test_byte_by_byte_feeding() {
        let mut parser = StreamParser::new();

        for byte in make_frame(b"status") {
            parser.feed(&[byte]);
        }

        assert_eq!(parser.frames_available(), 1);
        assert_eq!(parser.next_frame().unwrap().payload(), b"status");
    }

    #[test]
    fn test_shared_flag_between_frames() {
        let mut parser = StreamParser::new();

        let first = make_frame(b"one");
        let second = make_frame(b"two");
        // Drop the opening flag of the second frame: the closing flag of the
        // first one opens it.
        let mut data = first.clone();
        data.extend_from_slice(&second[1..]);

        parser.feed(&data);

        let frames: Vec<_> = parser.drain_frames().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload(), b"one");
        assert_eq!(frames[1].payload(), b"two");
    }

    #[test]
    fn test_garbage_before_flag_is_discarded() {
        let mut parser = StreamParser::new();

        let mut data = b"noise".to_vec();
        data.extend_from_slice(&make_frame(b"payload"));
        parser.feed(&data);

        assert_eq!(parser.next_frame().unwrap().payload(), b"payload");
        assert_eq!(parser.frames_dropped(), 0);
    }

    #[test]
    fn test_stuffed_bytes_round_trip() {
        let mut parser = StreamParser::new();
        let payload = [0x7E, 0x7D, 0x00, 0x7E];

        parser.feed(&make_frame(&payload));

        assert_eq!(parser.next_frame().unwrap().payload(), &payload);
    }

    #[test]
    fn test_bad_crc_is_dropped() {
        let mut parser = StreamParser::new();

        let mut data = vec![FRAME_FLAG];
        data.extend_from_slice(b"hello");
        let crc = crc16(b"hello").wrapping_add(1).to_le_bytes();
        data.extend_from_slice(&crc);
        data.push(FRAME_FLAG);

        parser.feed(&data);

        assert_eq!(parser.frames_available(), 0);
        assert_eq!(parser.frames_dropped(), 1);

        // Parser keeps working after a bad frame
        parser.feed(&make_frame(b"next"));
        assert_eq!(parser.next_frame().unwrap().payload(), b"next");
    }

    #[test]
    fn test_idle_flags_are_ignored() {
        let mut parser = StreamParser::new();

        parser.feed(&[FRAME_FLAG, FRAME_FLAG, FRAME_FLAG]);

        assert_eq!(parser.frames_available(), 0);
        assert_eq!(parser.frames_dropped(), 0);
        assert_eq!(parser.state(), ParserState::ReadingFrame);
    }

    #[test]
    fn test_abort_sequence_discards_frame() {
        let mut parser = StreamParser::new();

        parser.feed(&[FRAME_FLAG, b'a', b'b', FRAME_ESCAPE, FRAME_FLAG]);
        assert_eq!(parser.frames_dropped(), 1);
        assert_eq!(parser.state(), ParserState::ReadingFrame);

        parser.feed(&make_frame(b"ok")[1..]);
        assert_eq!(parser.next_frame().unwrap().payload(), b"ok");
    }

    #[test]
    fn test_oversized_frame_resets() {
        let mut parser = StreamParser::new();

        let mut data = vec![FRAME_FLAG];
        data.extend(std::iter::repeat_n(b'x', MAX_FRAME_SIZE + 1));
        parser.feed(&data);

        assert_eq!(parser.state(), ParserState::WaitingFlag);
        assert_eq!(parser.frames_dropped(), 1);

        parser.feed(&make_frame(b"after"));
        assert_eq!(parser.next_frame().unwrap().payload(), b"after");
    }

    #[test]
    fn test_clear_resets_parser() {
        let mut parser = StreamParser::new();

        parser.feed(&[FRAME_FLAG, b'a']);
        assert_eq!(parser.state(), ParserState::ReadingFrame);

        parser.clear();
        assert_eq!(parser.state(), ParserState::WaitingFlag);
        assert_eq!(parser.frames_available(), 0);
    }
}
