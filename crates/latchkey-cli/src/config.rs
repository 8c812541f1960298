//! Command-line and environment configuration.
//!
//! Every option can also be set through an environment variable, so the
//! gateway can run under a supervisor with no arguments at all.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use latchkey_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_DOOR_NAME, DEFAULT_ENTRY_TOPIC, DEFAULT_HTTP_TIMEOUT_MS,
    DEFAULT_MQTT_PORT, DEFAULT_SERIAL_PORT, DEFAULT_STATUS_TOPIC,
};
use latchkey_directory::DirectoryConfig;
use latchkey_hardware::SerialConfig;
use latchkey_telemetry::TelemetryConfig;

#[derive(Debug, Parser)]
#[command(name = "latchkey")]
#[command(version, about = "RFID door access gateway", long_about = None)]
pub struct Cli {
    /// Serial device connected to the door controller
    #[arg(long, default_value = DEFAULT_SERIAL_PORT, env = "LATCHKEY_SERIAL_PORT")]
    pub serial_port: String,

    /// Serial line speed
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE, env = "LATCHKEY_BAUD_RATE")]
    pub baud_rate: u32,

    /// Wild Apricot API key
    #[arg(long, env = "WILD_APRICOT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Timeout for one membership directory request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_MS, env = "LATCHKEY_HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: u64,

    /// File backing the offline login cache (in-memory only if unset)
    #[arg(long, env = "LATCHKEY_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Door name attached to log lines
    #[arg(long, default_value = DEFAULT_DOOR_NAME, env = "LATCHKEY_DOOR_NAME")]
    pub door_name: String,

    /// MQTT broker host (telemetry disabled if unset)
    #[arg(long, env = "LATCHKEY_MQTT_HOST")]
    pub mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long, default_value_t = DEFAULT_MQTT_PORT, env = "LATCHKEY_MQTT_PORT")]
    pub mqtt_port: u16,

    /// MQTT client id (random if unset)
    #[arg(long, env = "LATCHKEY_MQTT_CLIENT_ID")]
    pub mqtt_client_id: Option<String>,

    /// Retained topic for door status events
    #[arg(long, default_value = DEFAULT_STATUS_TOPIC, env = "LATCHKEY_STATUS_TOPIC")]
    pub status_topic: String,

    /// Retained topic for sign-in events
    #[arg(long, default_value = DEFAULT_ENTRY_TOPIC, env = "LATCHKEY_ENTRY_TOPIC")]
    pub entry_topic: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    /// Reject settings clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("Wild Apricot API key is empty");
        }
        if self.baud_rate == 0 {
            bail!("baud rate must be positive");
        }
        if self.http_timeout_ms == 0 {
            bail!("HTTP timeout must be positive");
        }
        if self.door_name.trim().is_empty() {
            bail!("door name is empty");
        }
        Ok(())
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(&self.serial_port).with_baud_rate(self.baud_rate)
    }

    pub fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig::new(&self.api_key)
            .with_timeout(Duration::from_millis(self.http_timeout_ms))
    }

    /// Broker settings, or `None` when no broker host is configured.
    pub fn telemetry_config(&self) -> Option<TelemetryConfig> {
        let host = self.mqtt_host.as_deref().filter(|h| !h.trim().is_empty())?;

        let config = TelemetryConfig::new(host)
            .with_port(self.mqtt_port)
            .with_status_topic(&self.status_topic)
            .with_entry_topic(&self.entry_topic);

        Some(match &self.mqtt_client_id {
            Some(client_id) => config.with_client_id(client_id),
            None => config,
        })
    }
}
