//! Membership directory client for the Latchkey gateway.
//!
//! Resolves an RFID card to a member and decides whether the membership
//! admits them. The [`MembershipDirectory`] trait is the seam used by the
//! decision engine; [`WildApricotClient`] talks to the Wild Apricot REST API
//! and [`MockDirectory`] serves an in-memory member table.
//!
//! Lookups never fail: transport and protocol errors collapse into
//! [`LookupOutcome::NetworkUnavailable`] and flip the shared
//! [`Connectivity`](latchkey_core::Connectivity) flag, which is what makes
//! the offline login cache kick in.

pub mod directory;
pub mod error;
pub mod mock;
pub mod record;
pub mod wild_apricot;

pub use directory::{LookupOutcome, MembershipDirectory};
pub use error::{DirectoryError, Result};
pub use mock::MockDirectory;
pub use record::{AccessRecord, AvatarRef};
pub use wild_apricot::{DirectoryConfig, WildApricotClient};
