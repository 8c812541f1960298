//! MQTT telemetry publisher.
//!
//! Events go out retained at QoS 1 so a dashboard subscribing late still sees
//! the current door state and the last sign-in. The `rumqttc` event loop is
//! driven by a background task; connection errors are logged and the next
//! poll reconnects.
//!
//! Publishing never waits on the broker. While it is unreachable the request
//! queue fills up and further events are dropped with an error, so the door
//! keeps deciding card reads and shutdown always completes.

use std::time::Duration;

use latchkey_core::constants::{DEFAULT_ENTRY_TOPIC, DEFAULT_MQTT_PORT, DEFAULT_STATUS_TOPIC};
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError};
use crate::event::{EntryEvent, StatusEvent};
use crate::sink::TelemetrySink;

const REQUEST_CHANNEL_CAPACITY: usize = 16;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker connection and topic settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub status_topic: String,
    pub entry_topic: String,
    pub keep_alive: Duration,

    /// Upper bound for `flush` to wait on the connection task.
    pub flush_timeout: Duration,
}

impl TelemetryConfig {
    /// Settings for `host` with default port, topics and a random client id.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_MQTT_PORT,
            client_id: format!("latchkey-{}", uuid::Uuid::new_v4().simple()),
            status_topic: DEFAULT_STATUS_TOPIC.to_string(),
            entry_topic: DEFAULT_ENTRY_TOPIC.to_string(),
            keep_alive: Duration::from_secs(30),
            flush_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_status_topic(mut self, topic: impl Into<String>) -> Self {
        self.status_topic = topic.into();
        self
    }

    pub fn with_entry_topic(mut self, topic: impl Into<String>) -> Self {
        self.entry_topic = topic.into();
        self
    }

    pub fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.flush_timeout = flush_timeout;
        self
    }
}

/// Telemetry sink publishing to an MQTT broker.
pub struct MqttTelemetry {
    client: AsyncClient,
    connection: Option<JoinHandle<()>>,
    config: TelemetryConfig,
}

impl MqttTelemetry {
    /// Create the client and start the connection task.
    ///
    /// Must be called inside a Tokio runtime. The broker does not need to be
    /// reachable yet; messages queue until it is.
    pub fn start(config: TelemetryConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let connection = tokio::spawn(drive(event_loop, config.host.clone()));

        info!(
            host = %config.host,
            port = config.port,
            client_id = %config.client_id,
            "MQTT telemetry started"
        );

        Self {
            client,
            connection: Some(connection),
            config,
        }
    }

    fn publish<T: Serialize>(&self, topic: &str, event: &T) -> Result<()> {
        let payload = serde_json::to_vec(event)?;

        match self.client.try_publish(topic, QoS::AtLeastOnce, true, payload) {
            Ok(()) => {
                debug!(topic = %topic, "Telemetry queued");
                Ok(())
            }
            Err(ClientError::TryRequest(_)) => Err(TelemetryError::Dropped {
                topic: topic.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl TelemetrySink for MqttTelemetry {
    async fn publish_status(&mut self, event: &StatusEvent) -> Result<()> {
        self.publish(&self.config.status_topic, event)
    }

    async fn publish_entry(&mut self, event: &EntryEvent) -> Result<()> {
        self.publish(&self.config.entry_topic, event)
    }

    async fn flush(&mut self) -> Result<()> {
        let Some(mut connection) = self.connection.take() else {
            return Ok(());
        };

        // Queued behind any pending publish, so those are written first.
        if let Err(e) = self.client.try_disconnect() {
            connection.abort();
            return Err(e.into());
        }

        match tokio::time::timeout(self.config.flush_timeout, &mut connection).await {
            Ok(_) => {
                info!("MQTT telemetry disconnected");
                Ok(())
            }
            Err(_) => {
                connection.abort();
                Err(TelemetryError::FlushTimeout {
                    timeout_ms: self.config.flush_timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl Drop for MqttTelemetry {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
    }
}

/// Poll the event loop until the client disconnects.
async fn drive(mut event_loop: EventLoop, host: String) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(host = %host, "Connected to MQTT broker");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(rumqttc::ConnectionError::RequestsDone) => break,
            Err(e) => {
                warn!(host = %host, error = %e, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
