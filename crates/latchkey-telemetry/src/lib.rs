//! Door telemetry for the Latchkey gateway.
//!
//! Status changes and sign-ins are published as JSON to retained MQTT
//! topics. The decision engine only sees the [`TelemetrySink`] trait; the
//! binary picks [`MqttTelemetry`] when a broker is configured and
//! [`DisabledTelemetry`] otherwise, and tests use [`RecordingTelemetry`].

pub mod error;
pub mod event;
pub mod mqtt;
pub mod sink;

pub use error::{Result, TelemetryError};
pub use event::{EntryEvent, StatusEvent};
pub use mqtt::{MqttTelemetry, TelemetryConfig};
pub use sink::{DisabledTelemetry, RecordingTelemetry, TelemetrySink};
