//! Bounded, persisted, most-recent-first login cache.
//!
//! Store format is a pretty-printed JSON array:
//!
//! ```text
//! [
//!   { "rfid": "5678", "display_name": "Bob", "timestamp": "2024-05-01T18:22:03Z" },
//!   { "rfid": "1234", "display_name": "Ann", "timestamp": "2024-05-01T17:01:44Z" }
//! ]
//! ```
//!
//! Writes go to a sibling temporary file which is synced and then renamed
//! over the store, so a power cut leaves either the old or the new contents.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use latchkey_core::Rfid;
use latchkey_core::constants::OFFLINE_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// One remembered successful online admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub rfid: Rfid,
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Offline fallback cache of recently admitted members.
///
/// # Examples
///
/// ```
/// use latchkey_core::Rfid;
/// use latchkey_storage::OfflineLoginCache;
///
/// let mut cache = OfflineLoginCache::load(None);
/// let rfid = Rfid::new("1234").unwrap();
///
/// cache.record(rfid.clone(), "Ann").unwrap();
/// assert_eq!(cache.lookup(&rfid), Some("Ann"));
/// ```
#[derive(Debug, Default)]
pub struct OfflineLoginCache {
    path: Option<PathBuf>,
    entries: Vec<CacheEntry>,
}

impl OfflineLoginCache {
    /// Load the cache from `path`.
    ///
    /// Never fails: a missing, empty or unreadable store, or no path at all,
    /// yields an empty cache.
    pub fn load(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            debug!("No cache path configured, offline logins kept in memory only");
            return Self::default();
        };

        let entries = match read_store(&path) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "Offline login cache loaded");
                entries
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Offline login cache unavailable, starting empty");
                Vec::new()
            }
        };

        let mut cache = Self {
            path: Some(path),
            entries: Vec::with_capacity(OFFLINE_CACHE_CAPACITY),
        };
        // Restore in store order while upholding one-entry-per-card and the bound.
        for entry in entries {
            if cache.entries.len() == OFFLINE_CACHE_CAPACITY {
                break;
            }
            if !cache.entries.iter().any(|e| e.rfid == entry.rfid) {
                cache.entries.push(entry);
            }
        }
        cache
    }

    /// Display name of the cached member holding `rfid`, if any.
    ///
    /// Lookups do not change recency.
    pub fn lookup(&self, rfid: &Rfid) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| &entry.rfid == rfid)
            .map(|entry| entry.display_name.as_str())
    }

    /// Remember a successful online admission and persist the cache.
    ///
    /// Any previous entry for the card is replaced, the new entry goes to the
    /// front and the oldest entries beyond capacity are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be written. The in-memory
    /// cache is updated regardless.
    pub fn record(&mut self, rfid: Rfid, display_name: impl Into<String>) -> StorageResult<()> {
        self.entries.retain(|entry| entry.rfid != rfid);
        self.entries.insert(
            0,
            CacheEntry {
                rfid,
                display_name: display_name.into(),
                timestamp: Utc::now(),
            },
        );
        self.entries.truncate(OFFLINE_CACHE_CAPACITY);

        match &self.path {
            Some(path) => write_store(path, &self.entries),
            None => Ok(()),
        }
    }

    /// Cached entries, most recent first.
    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Location of the store, if persistence is enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn read_store(path: &Path) -> StorageResult<Vec<CacheEntry>> {
    let data = fs::read(path).map_err(|e| StorageError::io(path, e))?;
    Ok(serde_json::from_slice(&data)?)
}

fn write_store(path: &Path, entries: &[CacheEntry]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let json = serde_json::to_vec_pretty(entries)?;
    let tmp = temp_path(path);

    let mut file = File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
    file.write_all(&json).map_err(|e| StorageError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
    debug!(path = %path.display(), entries = entries.len(), "Offline login cache saved");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfid(id: &str) -> Rfid {
        Rfid::new(id).unwrap()
    }

    #[test]
    fn test_lookup_miss_on_empty() {
        let cache = OfflineLoginCache::load(None);
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(&rfid("1")), None);
    }

    #[test]
    fn test_record_moves_to_front_without_duplicates() {
        let mut cache = OfflineLoginCache::load(None);
        cache.record(rfid("1"), "Ann").unwrap();
        cache.record(rfid("2"), "Bob").unwrap();
        cache.record(rfid("1"), "Ann B.").unwrap();

        let names: Vec<_> = cache.entries().iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, ["Ann B.", "Bob"]);
        assert_eq!(cache.lookup(&rfid("1")), Some("Ann B."));
    }

    #[test]
    fn test_lookup_does_not_change_order() {
        let mut cache = OfflineLoginCache::load(None);
        cache.record(rfid("1"), "Ann").unwrap();
        cache.record(rfid("2"), "Bob").unwrap();

        assert_eq!(cache.lookup(&rfid("1")), Some("Ann"));
        assert_eq!(cache.entries()[0].rfid, rfid("2"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = OfflineLoginCache::load(None);
        for i in 0..=OFFLINE_CACHE_CAPACITY {
            cache.record(rfid(&i.to_string()), format!("member {i}")).unwrap();
        }

        assert_eq!(cache.len(), OFFLINE_CACHE_CAPACITY);
        assert_eq!(cache.lookup(&rfid("0")), None);
        assert_eq!(
            cache.lookup(&rfid(&OFFLINE_CACHE_CAPACITY.to_string())),
            Some("member 10")
        );
    }

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("/var/lib/latchkey/logins.json")),
            PathBuf::from("/var/lib/latchkey/logins.json.tmp")
        );
    }
}
