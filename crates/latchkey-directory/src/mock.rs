//! In-memory membership directory for tests and offline development.
//!
//! Clones share state, so a test can keep one clone to flip the directory
//! offline or inspect lookups while the engine owns another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use latchkey_core::{Avatar, Connectivity, Rfid};
use serde_json::json;

use crate::directory::{LookupOutcome, MembershipDirectory};
use crate::record::AccessRecord;

#[derive(Debug, Default)]
struct State {
    members: HashMap<String, AccessRecord>,
    avatars: HashMap<String, String>,
    offline: bool,
    lookups: Vec<Rfid>,
}

/// Directory backed by a map of card ids to records.
///
/// # Examples
///
/// ```
/// use latchkey_core::Rfid;
/// use latchkey_directory::{LookupOutcome, MembershipDirectory, MockDirectory};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut directory = MockDirectory::new().with_member("1234", "Ann", "Active");
///
/// let outcome = directory.find_by_rfid(&Rfid::new("1234").unwrap()).await;
/// assert!(matches!(outcome, LookupOutcome::Found(r) if r.is_active()));
///
/// directory.set_offline(true);
/// let outcome = directory.find_by_rfid(&Rfid::new("1234").unwrap()).await;
/// assert_eq!(outcome, LookupOutcome::NetworkUnavailable);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<State>>,
    connectivity: Connectivity,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned connectivity flag.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Register a member with the given membership status.
    pub fn with_member(self, rfid: &str, name: &str, status: &str) -> Self {
        let contact = json!({
            "DisplayName": name,
            "FieldValues": [
                {"FieldName": "RFID", "Value": rfid},
                {"FieldName": "Membership status", "Value": {"Value": status}}
            ]
        });
        let record = AccessRecord {
            display_name: name.to_string(),
            membership_status: Some(status.to_string()),
            avatar: None,
            contact,
        };
        self.with_record(rfid, record)
    }

    /// Register a prepared record.
    pub fn with_record(self, rfid: &str, record: AccessRecord) -> Self {
        self.lock().members.insert(rfid.to_string(), record);
        self
    }

    /// Serve `base64` as the picture of members whose avatar id is `file_id`.
    pub fn with_avatar(self, file_id: &str, base64: &str) -> Self {
        self.lock()
            .avatars
            .insert(file_id.to_string(), base64.to_string());
        self
    }

    /// Simulate the service being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Cards looked up so far, oldest first.
    pub fn lookups(&self) -> Vec<Rfid> {
        self.lock().lookups.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MembershipDirectory for MockDirectory {
    async fn find_by_rfid(&mut self, rfid: &Rfid) -> LookupOutcome {
        let mut state = self.lock();
        state.lookups.push(rfid.clone());

        if state.offline {
            self.connectivity.set(false);
            return LookupOutcome::NetworkUnavailable;
        }

        self.connectivity.set(true);
        match state.members.get(rfid.as_str()) {
            Some(record) => LookupOutcome::Found(record.clone()),
            None => LookupOutcome::NotFound,
        }
    }

    async fn fetch_avatar(&mut self, record: &AccessRecord) -> Option<Avatar> {
        let avatar = record.avatar.as_ref()?;
        let state = self.lock();

        if state.offline {
            self.connectivity.set(false);
            return None;
        }

        state.avatars.get(&avatar.file_id).map(|base64| Avatar {
            file_id: avatar.file_id.clone(),
            base64: base64.clone(),
        })
    }

    fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }
}
