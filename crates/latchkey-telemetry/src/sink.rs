//! Telemetry sink abstraction and the non-MQTT sinks.

#![allow(async_fn_in_trait)]

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::Result;
use crate::event::{EntryEvent, StatusEvent};

/// Destination for door telemetry.
///
/// Publishing is fire-and-forget from the caller's point of view; an error
/// means the event was not queued and is only worth a log line.
pub trait TelemetrySink {
    /// Publish a door status change.
    async fn publish_status(&mut self, event: &StatusEvent) -> Result<()>;

    /// Publish a sign-in.
    async fn publish_entry(&mut self, event: &EntryEvent) -> Result<()>;

    /// Deliver anything still queued and close the connection.
    async fn flush(&mut self) -> Result<()>;
}

/// Sink used when no broker is configured. Events are logged at debug.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTelemetry;

impl TelemetrySink for DisabledTelemetry {
    async fn publish_status(&mut self, event: &StatusEvent) -> Result<()> {
        debug!(arduino_connected = event.arduino_connected, "Telemetry disabled, status not published");
        Ok(())
    }

    async fn publish_entry(&mut self, _event: &EntryEvent) -> Result<()> {
        debug!("Telemetry disabled, entry not published");
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Recorded {
    statuses: Vec<StatusEvent>,
    entries: Vec<EntryEvent>,
    flushes: usize,
}

/// Sink that keeps every event in memory.
///
/// Clones share the same record, so a test keeps one clone and hands the
/// other to the engine.
#[derive(Debug, Default, Clone)]
pub struct RecordingTelemetry {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status events published so far, oldest first.
    pub fn statuses(&self) -> Vec<StatusEvent> {
        self.lock().statuses.clone()
    }

    /// Entry events published so far, oldest first.
    pub fn entries(&self) -> Vec<EntryEvent> {
        self.lock().entries.clone()
    }

    /// Number of `flush` calls.
    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TelemetrySink for RecordingTelemetry {
    async fn publish_status(&mut self, event: &StatusEvent) -> Result<()> {
        self.lock().statuses.push(event.clone());
        Ok(())
    }

    async fn publish_entry(&mut self, event: &EntryEvent) -> Result<()> {
        self.lock().entries.push(event.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.lock().flushes += 1;
        Ok(())
    }
}
