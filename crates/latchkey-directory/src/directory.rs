//! Membership directory abstraction.
//!
//! Uses native `async fn` in traits; callers take the directory as a generic
//! parameter.

#![allow(async_fn_in_trait)]

use latchkey_core::{Avatar, Connectivity, Rfid};

use crate::record::AccessRecord;

/// Result of resolving a card against the directory.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The card belongs to this member.
    Found(AccessRecord),

    /// The directory answered and no member holds the card.
    NotFound,

    /// The directory could not be reached or did not answer sensibly.
    NetworkUnavailable,
}

/// Resolves RFID cards to membership records.
///
/// Implementations own the [`Connectivity`] flag and update it after every
/// authentication, lookup or avatar fetch.
pub trait MembershipDirectory {
    /// Look up the member holding `rfid`.
    async fn find_by_rfid(&mut self, rfid: &Rfid) -> LookupOutcome;

    /// Fetch the member picture, if the record references one.
    ///
    /// Failures yield `None` and mark the directory disconnected.
    async fn fetch_avatar(&mut self, record: &AccessRecord) -> Option<Avatar>;

    /// Shared connectivity flag.
    fn connectivity(&self) -> &Connectivity;
}
