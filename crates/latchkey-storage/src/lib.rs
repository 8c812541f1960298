//! Offline login cache for the Latchkey gateway.
//!
//! When the membership directory cannot be reached, the gateway still admits
//! the most recent members that were admitted online. [`OfflineLoginCache`]
//! keeps those members, most recent first, bounded to
//! [`OFFLINE_CACHE_CAPACITY`](latchkey_core::constants::OFFLINE_CACHE_CAPACITY)
//! entries, and persists them as a JSON file after every change.

pub mod cache;
pub mod error;

pub use cache::{CacheEntry, OfflineLoginCache};
pub use error::{StorageError, StorageResult};
