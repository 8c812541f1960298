//! JSON payloads carried inside frames.
//!
//! Every payload is a UTF-8 JSON object whose `message` field selects the
//! kind:
//!
//! ```text
//! {"message":"rfid_card","rfid":"0004213370"}
//! {"message":"status","door_open":false,"locked":true,"lock_open":false}
//! {"message":"lock_ctrl","unlock":true}
//! ```

use bytes::Bytes;
use latchkey_core::{Error, InboundMessage, OutboundMessage, Result};

/// Decode a frame payload sent by the door controller.
///
/// # Errors
///
/// Returns `Error::InvalidMessageFormat` if the payload is not UTF-8, not
/// JSON, lacks a `message` field, names an unknown message kind, or is
/// missing a variant field.
///
/// # Examples
///
/// ```
/// use latchkey_core::InboundMessage;
/// use latchkey_protocol::decode_inbound;
///
/// let msg = decode_inbound(br#"{"message":"rfid_card","rfid":"1234"}"#).unwrap();
/// assert!(matches!(msg, InboundMessage::RfidCard { .. }));
///
/// assert!(decode_inbound(br#"{"message":"reboot"}"#).is_err());
/// ```
pub fn decode_inbound(payload: &[u8]) -> Result<InboundMessage> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::invalid_message(format!("payload is not UTF-8: {e}")))?;

    serde_json::from_str(text).map_err(|e| Error::invalid_message(format!("{e}: {text}")))
}

/// Encode a command for the door controller.
///
/// # Errors
///
/// Returns `Error::InvalidMessageFormat` if serialization fails.
pub fn encode_outbound(message: &OutboundMessage) -> Result<Bytes> {
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| Error::invalid_message(format!("failed to encode command: {e}")))
}
