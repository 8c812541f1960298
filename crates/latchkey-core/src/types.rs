use crate::{Result, error::Error};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use subtle::ConstantTimeEq;

/// RFID card identifier as reported by the door controller.
///
/// The controller sends the decimal card id, either as a JSON string or as a
/// bare number; both are normalised to the trimmed decimal string.
///
/// # Security
/// Comparison is constant-time so cache lookups do not leak how much of a
/// card id matched.
#[derive(Debug, Clone, Eq, Serialize)]
#[serde(transparent)]
pub struct Rfid(String);

impl Rfid {
    /// Create a new RFID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidRfid` if the id is empty after trimming or is
    /// not ASCII.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();

        if id.is_empty() {
            return Err(Error::InvalidRfid("RFID must not be empty".to_string()));
        }

        if !id.is_ascii() {
            return Err(Error::InvalidRfid(format!("RFID must be ASCII, got {id:?}")));
        }

        Ok(Rfid(id.to_string()))
    }

    /// Get the RFID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rfid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Rfid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Rfid::new(s)
    }
}

impl PartialEq for Rfid {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for Rfid {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<'de> Deserialize<'de> for Rfid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RfidVisitor;

        impl de::Visitor<'_> for RfidVisitor {
            type Value = Rfid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an RFID as a string or unsigned integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Rfid, E> {
                Rfid::new(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Rfid, E> {
                Ok(Rfid(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Rfid, E> {
                if v < 0 {
                    return Err(E::custom(format!("negative RFID {v}")));
                }
                Ok(Rfid(v.to_string()))
            }
        }

        deserializer.deserialize_any(RfidVisitor)
    }
}

/// Door and lock state reported by the controller.
///
/// Wire shape: `{"message":"status","door_open":false,"locked":true,"lock_open":false}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoorStatus {
    /// Door contact reports the door open.
    pub door_open: bool,

    /// Latch sensor reports the latch engaged.
    pub locked: bool,

    /// Controller is currently driving the strike open.
    pub lock_open: bool,
}

impl DoorStatus {
    /// Human-readable door/latch summary used in status logs.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_core::DoorStatus;
    ///
    /// let status = DoorStatus { door_open: false, locked: true, lock_open: false };
    /// assert_eq!(status.describe(), "Door: closed, Latch: locked, (Lock signaled)");
    /// ```
    #[must_use]
    pub fn describe(&self) -> String {
        let door = if self.door_open { "open" } else { "closed" };
        let latch = if self.locked { "locked" } else { "unlocked" };
        let signal = if self.lock_open {
            "(Unlock signaled)"
        } else {
            "(Lock signaled)"
        };
        format!("Door: {door}, Latch: {latch}, {signal}")
    }
}

impl fmt::Display for DoorStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Message received from the door controller.
///
/// The `message` field selects the variant. Unknown variants fail to decode
/// and are dropped by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum InboundMessage {
    /// A card was presented to the reader.
    RfidCard { rfid: Rfid },

    /// Periodic or edge-triggered door/lock state.
    Status(DoorStatus),
}

impl InboundMessage {
    /// Returns `true` for card reads, which are subject to debounce.
    #[inline]
    #[must_use]
    pub fn is_rfid_card(&self) -> bool {
        matches!(self, InboundMessage::RfidCard { .. })
    }

    /// Short kind label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::RfidCard { .. } => "rfid_card",
            InboundMessage::Status(_) => "status",
        }
    }
}

/// Command sent to the door controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Drive the strike; `{"message":"lock_ctrl","unlock":true}`.
    LockCtrl { unlock: bool },
}

impl OutboundMessage {
    /// The only command this gateway issues.
    #[must_use]
    pub fn unlock() -> Self {
        OutboundMessage::LockCtrl { unlock: true }
    }
}

/// Member picture fetched from the directory.
///
/// Serializes as a single-key object, `{"<file_id>": "<base64>"}`, which is
/// the shape sign-in consumers expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub file_id: String,
    pub base64: String,
}

impl Serialize for Avatar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.file_id, &self.base64)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234", "1234")]
    #[case("  0004213370 ", "0004213370")]
    #[case("ABCDEF01", "ABCDEF01")]
    fn test_rfid_valid(#[case] input: &str, #[case] expected: &str) {
        let rfid = Rfid::new(input).unwrap();
        assert_eq!(rfid.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("12é4")]
    fn test_rfid_invalid(#[case] input: &str) {
        assert!(matches!(Rfid::new(input), Err(Error::InvalidRfid(_))));
    }

    #[test]
    fn test_rfid_equality() {
        assert_eq!(Rfid::new("1234").unwrap(), Rfid::new(" 1234").unwrap());
        assert_ne!(Rfid::new("1234").unwrap(), Rfid::new("12345").unwrap());
    }

    #[test]
    fn test_rfid_deserializes_from_number() {
        let rfid: Rfid = serde_json::from_str("5678").unwrap();
        assert_eq!(rfid.as_str(), "5678");

        let rfid: Rfid = serde_json::from_str("\"5678\"").unwrap();
        assert_eq!(rfid.as_str(), "5678");

        assert!(serde_json::from_str::<Rfid>("-1").is_err());
        assert!(serde_json::from_str::<Rfid>("true").is_err());
    }

    #[rstest]
    #[case(false, true, false, "Door: closed, Latch: locked, (Lock signaled)")]
    #[case(true, false, true, "Door: open, Latch: unlocked, (Unlock signaled)")]
    #[case(false, false, true, "Door: closed, Latch: unlocked, (Unlock signaled)")]
    fn test_door_status_describe(
        #[case] door_open: bool,
        #[case] locked: bool,
        #[case] lock_open: bool,
        #[case] expected: &str,
    ) {
        let status = DoorStatus {
            door_open,
            locked,
            lock_open,
        };
        assert_eq!(status.describe(), expected);
        assert_eq!(status.to_string(), expected);
    }

    #[test]
    fn test_inbound_message_tags() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"message":"rfid_card","rfid":"1234"}"#).unwrap();
        assert!(msg.is_rfid_card());
        assert_eq!(msg.kind(), "rfid_card");

        let msg: InboundMessage = serde_json::from_str(
            r#"{"message":"status","door_open":true,"locked":false,"lock_open":false}"#,
        )
        .unwrap();
        assert!(!msg.is_rfid_card());
        assert_eq!(msg.kind(), "status");
    }

    #[test]
    fn test_unlock_command_wire_shape() {
        let json = serde_json::to_value(OutboundMessage::unlock()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "lock_ctrl", "unlock": true})
        );
    }

    #[test]
    fn test_avatar_serializes_keyed_by_file_id() {
        let avatar = Avatar {
            file_id: "42".to_string(),
            base64: "aGVsbG8=".to_string(),
        };
        assert_eq!(
            serde_json::to_value(avatar).unwrap(),
            serde_json::json!({"42": "aGVsbG8="})
        );
    }
}
