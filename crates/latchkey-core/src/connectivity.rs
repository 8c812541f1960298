//! Shared network connectivity flag.
//!
//! The membership directory client owns the writes; the decision engine and
//! the status reporter only read it to annotate logs and telemetry.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to the directory connectivity flag.
///
/// # Examples
///
/// ```
/// use latchkey_core::Connectivity;
///
/// let connectivity = Connectivity::new();
/// let reader = connectivity.clone();
///
/// connectivity.set(true);
/// assert!(reader.is_connected());
/// assert_eq!(reader.label(), "(Network Connected)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    connected: Arc<AtomicBool>,
}

impl Connectivity {
    /// Create a flag in the disconnected state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of the latest directory call.
    pub fn set(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Whether the last directory call reached the service.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Log annotation for the current state.
    pub fn label(&self) -> &'static str {
        if self.is_connected() {
            "(Network Connected)"
        } else {
            "(Network Disconnected)"
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
