//! Telemetry payloads.
//!
//! ```text
//! door/status  {"door_open":false,"locked":true,"lock_open":false,
//!               "arduino_connected":true,"network_connected":true,
//!               "timestamp":"2024-05-01T18:22:03.120Z"}
//! door/entry   {"contact":{...},"avatar":{"77":"aGVsbG8="},
//!               "signin_time":"2024-05-01T18:22:03.450Z","source":"rfid"}
//! ```

use chrono::{DateTime, Utc};
use latchkey_core::constants::ENTRY_SOURCE_RFID;
use latchkey_core::{Avatar, DoorStatus};
use serde::Serialize;
use serde_json::Value;

/// Door state as published on the status topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    /// Last reported door state; absent if the controller never reported one.
    #[serde(flatten)]
    pub status: Option<DoorStatus>,

    /// Whether the serial link to the controller is up.
    pub arduino_connected: bool,

    /// Whether the membership directory was reachable on the last call.
    pub network_connected: bool,

    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// A status just received from a connected controller.
    pub fn report(status: DoorStatus, network_connected: bool) -> Self {
        Self {
            status: Some(status),
            arduino_connected: true,
            network_connected,
            timestamp: Utc::now(),
        }
    }

    /// Final event published when the serial link is lost.
    pub fn link_lost(last: Option<DoorStatus>, network_connected: bool) -> Self {
        Self {
            status: last,
            arduino_connected: false,
            network_connected,
            timestamp: Utc::now(),
        }
    }
}

/// A member signed in at the door.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryEvent {
    /// Contact document as returned by the directory.
    pub contact: Value,
    pub avatar: Option<Avatar>,
    pub signin_time: DateTime<Utc>,
    pub source: &'static str,
}

impl EntryEvent {
    /// Sign-in by RFID card, timestamped now.
    pub fn rfid(contact: Value, avatar: Option<Avatar>) -> Self {
        Self {
            contact,
            avatar,
            signin_time: Utc::now(),
            source: ENTRY_SOURCE_RFID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_event_shape() {
        let status = DoorStatus {
            door_open: false,
            locked: true,
            lock_open: false,
        };
        let value = serde_json::to_value(StatusEvent::report(status, true)).unwrap();

        assert_eq!(value["door_open"], json!(false));
        assert_eq!(value["locked"], json!(true));
        assert_eq!(value["lock_open"], json!(false));
        assert_eq!(value["arduino_connected"], json!(true));
        assert_eq!(value["network_connected"], json!(true));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_link_lost_without_status() {
        let value = serde_json::to_value(StatusEvent::link_lost(None, false)).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("door_open"));
        assert_eq!(object["arduino_connected"], json!(false));
        assert_eq!(object["network_connected"], json!(false));
    }

    #[test]
    fn test_entry_event_shape() {
        let avatar = Avatar {
            file_id: "77".to_string(),
            base64: "aGVsbG8=".to_string(),
        };
        let event = EntryEvent::rfid(json!({"DisplayName": "Ann"}), Some(avatar));
        let value = serde_json::to_value(event).unwrap();

        assert_eq!(value["contact"]["DisplayName"], json!("Ann"));
        assert_eq!(value["avatar"], json!({"77": "aGVsbG8="}));
        assert_eq!(value["source"], json!("rfid"));
        assert!(value["signin_time"].is_string());
    }

    #[test]
    fn test_entry_event_without_avatar() {
        let value = serde_json::to_value(EntryEvent::rfid(json!({}), None)).unwrap();
        assert_eq!(value["avatar"], Value::Null);
    }
}
