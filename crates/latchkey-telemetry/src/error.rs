use thiserror::Error;

/// Errors raised while publishing telemetry.
///
/// Telemetry is best effort: the decision engine logs these and carries on.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The MQTT request queue rejected the message
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The request queue was full or closed; the event was dropped
    #[error("Telemetry queue unavailable, dropped event for {topic}")]
    Dropped { topic: String },

    /// Event could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection task did not finish in time
    #[error("Flush timed out after {timeout_ms}ms")]
    FlushTimeout { timeout_ms: u64 },
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
