//! Event bridge lifecycle.
//!
//! # States
//!
//! - `Idle`: constructed, reader not started
//! - `Running`: reader thread active, processing loop dequeuing
//! - `Stopping`: link lost or shutdown requested; tearing down
//! - `Terminated`: final status published, process about to exit
//!
//! # Valid Transitions
//!
//! - Idle → Running → Stopping → Terminated
//!
//! Anything else is rejected with `Error::InvalidStateTransition`.
//!
//! # Examples
//!
//! ```
//! use latchkey_gateway::{BridgeState, Lifecycle};
//!
//! let mut lifecycle = Lifecycle::new();
//! lifecycle.transition_to(BridgeState::Running).unwrap();
//! assert!(lifecycle.transition_to(BridgeState::Terminated).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use latchkey_core::{Error, Result};

/// Transitions kept for diagnostics. A full run has three.
const MAX_HISTORY_SIZE: usize = 16;

/// Lifecycle states of the event bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            BridgeState::Idle => "Idle",
            BridgeState::Running => "Running",
            BridgeState::Stopping => "Stopping",
            BridgeState::Terminated => "Terminated",
        };
        f.write_str(state_str)
    }
}

impl BridgeState {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use latchkey_gateway::BridgeState;
    ///
    /// assert!(BridgeState::Running.can_transition_to(&BridgeState::Stopping));
    /// assert!(!BridgeState::Stopping.can_transition_to(&BridgeState::Running));
    /// ```
    pub fn can_transition_to(&self, target: &BridgeState) -> bool {
        matches!(
            (self, target),
            (BridgeState::Idle, BridgeState::Running)
                | (BridgeState::Running, BridgeState::Stopping)
                | (BridgeState::Stopping, BridgeState::Terminated)
        )
    }

    /// `Terminated` has no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Terminated)
    }
}

/// A single state transition with timestamp.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: BridgeState,
    pub to: BridgeState,
    pub timestamp: Instant,
}

/// Lifecycle tracker enforcing the transition table.
#[derive(Debug)]
pub struct Lifecycle {
    current_state: BridgeState,
    history: VecDeque<StateTransition>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Idle` state.
    pub fn new() -> Self {
        Self {
            current_state: BridgeState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> BridgeState {
        self.current_state
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not in
    /// the table. The state is left unchanged.
    pub fn transition_to(&mut self, new_state: BridgeState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition {
            from: self.current_state,
            to: new_state,
            timestamp: Instant::now(),
        };

        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());
        self.current_state = new_state;

        Ok(transition)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
