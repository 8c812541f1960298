//! Core constants for the Latchkey door gateway.
//!
//! This module collects the timing windows, capacities, wire-level framing
//! bytes and default endpoints shared by every crate in the workspace.
//!
//! # Serial Framing
//!
//! Frames exchanged with the door microcontroller use HDLC-style framing:
//!
//! ```text
//! FLAG  <escaped payload + CRC-16 (little endian)>  FLAG
//! 0x7E   {"message":"status",...} 0xAB 0xCD         0x7E
//! ```
//!
//! Inside a frame, `FLAG` and `ESCAPE` bytes are replaced by `ESCAPE` followed
//! by the original byte XOR [`ESCAPE_XOR`].
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//! use std::time::Duration;
//!
//! let window = Duration::from_millis(DEBOUNCE_WINDOW_MS);
//! assert_eq!(window.as_secs_f32(), 1.5);
//! assert_eq!(OFFLINE_CACHE_CAPACITY, 10);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Frame boundary marker.
pub const FRAME_FLAG: u8 = 0x7E;

/// Control escape byte.
pub const FRAME_ESCAPE: u8 = 0x7D;

/// Value XORed into an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// CRC-16/CCITT polynomial.
pub const CRC16_POLY: u16 = 0x1021;

/// CRC-16/CCITT initial register value.
pub const CRC16_INIT: u16 = 0xFFFF;

/// Number of CRC bytes trailing every frame payload.
pub const CRC_LEN: usize = 2;

/// Maximum unescaped frame size (payload plus CRC) in bytes.
///
/// Door controller messages are a few dozen bytes; anything larger is line
/// noise or a stuck transmitter.
pub const MAX_FRAME_SIZE: usize = 4 * 1024;

// ============================================================================
// Serial Link
// ============================================================================

/// Default serial device path.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout for a single blocking serial read (milliseconds).
///
/// Bounds how long the reader takes to observe a stop request.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

// ============================================================================
// Event Bridge
// ============================================================================

/// Minimum spacing between two accepted RFID reads (milliseconds).
pub const DEBOUNCE_WINDOW_MS: u64 = 1500;

/// Bounded wait for one dequeue attempt in the processing loop (milliseconds).
pub const QUEUE_POLL_INTERVAL_MS: u64 = 250;

// ============================================================================
// Offline Login Cache
// ============================================================================

/// Maximum number of cached logins kept for offline admission.
pub const OFFLINE_CACHE_CAPACITY: usize = 10;

// ============================================================================
// Membership Directory
// ============================================================================

/// Name of the contact field carrying the membership level status.
pub const MEMBERSHIP_STATUS_FIELD: &str = "Membership status";

/// Name of the contact field carrying the member picture.
pub const AVATAR_FIELD: &str = "Avatar";

/// Membership statuses admitted at the door.
///
/// `Lapsed` members keep a grace-period admit with no time bound.
pub const ADMITTED_MEMBERSHIP_STATUSES: [&str; 2] = ["Active", "Lapsed"];

/// Default OAuth token endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://oauth.wildapricot.org/auth/token";

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.wildapricot.org";

/// Default timeout for one directory HTTP request (milliseconds).
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

// ============================================================================
// Telemetry
// ============================================================================

/// Default retained topic for door status events.
pub const DEFAULT_STATUS_TOPIC: &str = "door/status";

/// Default retained topic for sign-in events.
pub const DEFAULT_ENTRY_TOPIC: &str = "door/entry";

/// Default MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Source tag attached to sign-in events.
pub const ENTRY_SOURCE_RFID: &str = "rfid";

// ============================================================================
// Process
// ============================================================================

/// Door name attached to log lines when none is configured.
pub const DEFAULT_DOOR_NAME: &str = "front-door";

/// Exit code after the serial link is lost or a shutdown is requested.
pub const EXIT_CODE_TERMINATED: i32 = 1;

/// Exit code when startup fails before the bridge runs.
pub const EXIT_CODE_STARTUP: i32 = 2;
