//! Card read debouncing.
//!
//! A card held against the reader is reported many times per second. Only
//! the first read of a burst is acted upon: a read is accepted when at least
//! the debounce window has passed since the last *accepted* read.

use std::time::{Duration, Instant};

use latchkey_core::constants::DEBOUNCE_WINDOW_MS;

/// Debounce timer for RFID reads.
///
/// # Examples
///
/// ```
/// use latchkey_gateway::Debouncer;
/// use std::time::{Duration, Instant};
///
/// let mut debouncer = Debouncer::default();
/// let t0 = Instant::now();
///
/// assert!(debouncer.accept(t0));
/// assert!(!debouncer.accept(t0 + Duration::from_millis(200)));
/// assert!(debouncer.accept(t0 + Duration::from_millis(1500)));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Decide whether a read at `now` is accepted, and if so restart the
    /// window from it.
    pub fn accept(&mut self, now: Instant) -> bool {
        let accepted = self
            .last_accepted
            .is_none_or(|last| now.saturating_duration_since(last) >= self.window);

        if accepted {
            self.last_accepted = Some(now);
        }
        accepted
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_WINDOW_MS))
    }
}
