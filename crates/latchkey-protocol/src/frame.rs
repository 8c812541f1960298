//! A single HDLC frame and its wire encoding.
//!
//! A [`Frame`] holds the unescaped payload only. The CRC trailer, byte
//! stuffing and flag delimiters are added by [`Frame::encode`] and checked by
//! [`Frame::from_unescaped`].

use bytes::{BufMut, Bytes, BytesMut};
use latchkey_core::constants::{
    CRC_LEN, CRC16_INIT, CRC16_POLY, ESCAPE_XOR, FRAME_ESCAPE, FRAME_FLAG, MAX_FRAME_SIZE,
};
use latchkey_core::{Error, Result};
use std::fmt;

/// CRC-16/CCITT (poly 0x1021, init 0xFFFF, no reflection, no final XOR).
///
/// # Examples
///
/// ```
/// use latchkey_protocol::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x29B1);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_INIT, |mut crc, &byte| {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
        }
        crc
    })
}

/// Unescaped frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap a payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Build a frame from unescaped bytes that still carry the CRC trailer.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidMessageFormat` if there are fewer bytes than the CRC.
    /// - `Error::CrcMismatch` if the trailer does not match the payload.
    pub fn from_unescaped(raw: &[u8]) -> Result<Self> {
        if raw.len() < CRC_LEN {
            return Err(Error::invalid_message(format!(
                "frame of {} bytes is shorter than its CRC",
                raw.len()
            )));
        }

        let (payload, trailer) = raw.split_at(raw.len() - CRC_LEN);
        let actual = u16::from_le_bytes([trailer[0], trailer[1]]);
        let expected = crc16(payload);

        if expected != actual {
            return Err(Error::CrcMismatch { expected, actual });
        }

        Ok(Self::new(Bytes::copy_from_slice(payload)))
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, returning the payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidMessageFormat` if the payload is not UTF-8.
    pub fn to_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| Error::invalid_message(format!("frame payload is not UTF-8: {e}")))
    }

    /// Append the wire form (flag, stuffed payload and CRC, flag) to `dst`.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameTooLarge` if payload plus CRC exceeds
    /// [`MAX_FRAME_SIZE`].
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let size = self.payload.len() + CRC_LEN;
        if size > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size,
                max_size: MAX_FRAME_SIZE,
            });
        }

        let crc = crc16(&self.payload).to_le_bytes();

        // Worst case every byte is stuffed.
        dst.reserve(2 * size + 2);
        dst.put_u8(FRAME_FLAG);
        for &byte in self.payload.iter().chain(crc.iter()) {
            if byte == FRAME_FLAG || byte == FRAME_ESCAPE {
                dst.put_u8(FRAME_ESCAPE);
                dst.put_u8(byte ^ ESCAPE_XOR);
            } else {
                dst.put_u8(byte);
            }
        }
        dst.put_u8(FRAME_FLAG);

        Ok(())
    }

    /// Wire form as a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`Frame::encode`].
    pub fn to_wire(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.payload))
    }
}
