//! Access decision engine and status reporter.
//!
//! Consumes one queued message at a time:
//!
//! - `status`: log the door state (info when it changed, debug otherwise)
//!   and publish changes to telemetry.
//! - `rfid_card`: resolve the card against the directory, falling back to
//!   the offline login cache when the directory is unreachable, and unlock
//!   the door for admitted members.
//!
//! # Decision table
//!
//! | Directory outcome    | Cache    | Result                              |
//! |----------------------|----------|-------------------------------------|
//! | Found, active        | -        | unlock, record in cache, entry event |
//! | Found, inactive      | -        | deny                                |
//! | NotFound             | ignored  | unknown (online)                    |
//! | NetworkUnavailable   | hit      | unlock with cached name             |
//! | NetworkUnavailable   | miss     | unknown (offline)                   |

use latchkey_core::{DoorStatus, InboundMessage, OutboundMessage, Rfid};
use latchkey_directory::{AccessRecord, LookupOutcome, MembershipDirectory};
use latchkey_hardware::FrameSink;
use latchkey_protocol::encode_outbound;
use latchkey_storage::OfflineLoginCache;
use latchkey_telemetry::{EntryEvent, StatusEvent, TelemetrySink};
use tracing::{debug, error, info, warn};

use crate::context::GatewayContext;

/// Where an admission was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantSource {
    /// The directory confirmed an active membership.
    Directory,

    /// The directory was unreachable and the card was in the login cache.
    OfflineCache,
}

/// Result of handling one card read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted { name: String, source: GrantSource },
    Denied { name: String },
    UnknownOnline,
    UnknownOffline,
}

impl AccessOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted { .. })
    }
}

/// Result of handling one status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReport {
    Changed,
    Unchanged,
}

/// Result of handling any queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    Access(AccessOutcome),
    Status(StatusReport),
}

/// Decision engine for one door.
pub struct AccessEngine<D, T, K> {
    context: GatewayContext,
    directory: D,
    telemetry: T,
    link: K,
    cache: OfflineLoginCache,
    last_status: Option<DoorStatus>,
}

impl<D, T, K> AccessEngine<D, T, K>
where
    D: MembershipDirectory,
    T: TelemetrySink,
    K: FrameSink,
{
    pub fn new(
        context: GatewayContext,
        directory: D,
        telemetry: T,
        link: K,
        cache: OfflineLoginCache,
    ) -> Self {
        Self {
            context,
            directory,
            telemetry,
            link,
            cache,
            last_status: None,
        }
    }

    /// Handle one message from the queue.
    pub async fn process(&mut self, message: InboundMessage) -> Processed {
        match message {
            InboundMessage::RfidCard { rfid } => Processed::Access(self.handle_card(&rfid).await),
            InboundMessage::Status(status) => Processed::Status(self.handle_status(status).await),
        }
    }

    /// Log a door status and publish it if it differs from the last one.
    pub async fn handle_status(&mut self, status: DoorStatus) -> StatusReport {
        let door = &self.context.door_name;
        let connectivity = &self.context.connectivity;
        let changed = self.last_status != Some(status);
        self.last_status = Some(status);

        if !changed {
            debug!(door = %door, "{connectivity} Status: {status}");
            return StatusReport::Unchanged;
        }

        info!(door = %door, "{connectivity} Status: {status}");

        let event = StatusEvent::report(status, connectivity.is_connected());
        if let Err(e) = self.telemetry.publish_status(&event).await {
            warn!(door = %door, error = %e, "Status telemetry not published");
        }
        StatusReport::Changed
    }

    /// Decide on a card read and unlock the door if admitted.
    pub async fn handle_card(&mut self, rfid: &Rfid) -> AccessOutcome {
        match self.directory.find_by_rfid(rfid).await {
            LookupOutcome::Found(record) if record.is_active() => self.admit_online(rfid, record).await,
            LookupOutcome::Found(record) => {
                info!(door = %self.context.door_name, "Access denied to: {}", record.display_name);
                AccessOutcome::Denied {
                    name: record.display_name,
                }
            }
            LookupOutcome::NotFound => {
                warn!(door = %self.context.door_name, "(Network Connected) Unknown RFID: {rfid}");
                AccessOutcome::UnknownOnline
            }
            LookupOutcome::NetworkUnavailable => match self.cache.lookup(rfid) {
                Some(name) => {
                    let name = name.to_string();
                    self.unlock(&name);
                    AccessOutcome::Granted {
                        name,
                        source: GrantSource::OfflineCache,
                    }
                }
                None => {
                    warn!(door = %self.context.door_name, "(Network Disconnected) Unknown RFID: {rfid}");
                    AccessOutcome::UnknownOffline
                }
            },
        }
    }

    async fn admit_online(&mut self, rfid: &Rfid, record: AccessRecord) -> AccessOutcome {
        let door = self.context.door_name.clone();
        self.unlock(&record.display_name);

        match self.cache.record(rfid.clone(), record.display_name.clone()) {
            Ok(()) => debug!(door = %door, cached = self.cache.len(), "Offline login cache updated"),
            Err(e) => error!(door = %door, error = %e, "Failed to persist offline login cache"),
        }

        let avatar = self.directory.fetch_avatar(&record).await;
        let event = EntryEvent::rfid(record.contact, avatar);
        if let Err(e) = self.telemetry.publish_entry(&event).await {
            warn!(door = %door, error = %e, "Entry telemetry not published");
        }

        AccessOutcome::Granted {
            name: record.display_name,
            source: GrantSource::Directory,
        }
    }

    /// Send the unlock command. Fire-and-forget: a dead link is noticed by
    /// the reader.
    fn unlock(&mut self, name: &str) {
        let door = &self.context.door_name;
        let command = match encode_outbound(&OutboundMessage::unlock()) {
            Ok(command) => command,
            Err(e) => {
                error!(door = %door, error = %e, "Failed to encode unlock command");
                return;
            }
        };

        if let Err(e) = self.link.send_frame(&command) {
            error!(door = %door, error = %e, "Failed to send unlock command");
        }

        info!(door = %door, "{} Opening door for: {name}", self.context.connectivity);
        debug!(door = %door, "Sending: {}", String::from_utf8_lossy(&command));
    }

    /// Close the link and publish the final `arduino_connected: false`
    /// status. Best effort; nothing is retried.
    pub async fn shutdown(&mut self) {
        let door = &self.context.door_name;
        self.link.close();

        let event = StatusEvent::link_lost(self.last_status, self.context.connectivity.is_connected());
        if let Err(e) = self.telemetry.publish_status(&event).await {
            warn!(door = %door, error = %e, "Final status not published");
        }
        if let Err(e) = self.telemetry.flush().await {
            warn!(door = %door, error = %e, "Telemetry flush failed");
        }
    }

    pub fn last_status(&self) -> Option<DoorStatus> {
        self.last_status
    }

    pub fn cache(&self) -> &OfflineLoginCache {
        &self.cache
    }

    pub fn context(&self) -> &GatewayContext {
        &self.context
    }
}
