//! Reload cycle bookkeeping.
//!
//! ```text
//! Idle ─request→ ReloadRequested ─track*/seal→ Tracking ─last finish→ ReloadCompleted ─take→ Idle
//! ```
//!
//! Sealing with nothing in flight goes straight to `ReloadCompleted`.

use crate::operation::Ticket;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadState {
    Idle,
    ReloadRequested,
    Tracking,
    ReloadCompleted,
}

#[derive(Debug, Clone)]
pub struct ReloadTracker {
    state: ReloadState,
    in_flight: BTreeSet<Ticket>,
}

impl Default for ReloadTracker {
    fn default() -> Self {
        Self {
            state: ReloadState::Idle,
            in_flight: BTreeSet::new(),
        }
    }
}

impl ReloadTracker {
    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// Any state but `Idle`.
    pub fn is_reloading(&self) -> bool {
        self.state != ReloadState::Idle
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start a cycle. A cycle already under way is restarted and its
    /// outstanding tickets are no longer waited on.
    pub fn request(&mut self) {
        self.in_flight.clear();
        self.state = ReloadState::ReloadRequested;
    }

    /// Wait for `ticket` before completing. Ignored outside a cycle.
    pub fn track(&mut self, ticket: Ticket) {
        if self.state == ReloadState::ReloadRequested {
            self.in_flight.insert(ticket);
        }
    }

    /// Every load of the cycle has been issued.
    pub fn seal(&mut self) {
        if self.state != ReloadState::ReloadRequested {
            return;
        }
        self.state = if self.in_flight.is_empty() {
            ReloadState::ReloadCompleted
        } else {
            ReloadState::Tracking
        };
    }

    /// Record that `ticket` finished, successfully or not. Returns whether
    /// this finished the cycle.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        if !self.in_flight.remove(&ticket) {
            return false;
        }
        if self.state == ReloadState::Tracking && self.in_flight.is_empty() {
            self.state = ReloadState::ReloadCompleted;
            return true;
        }
        false
    }

    /// Consume a completed cycle, returning to `Idle`.
    pub fn take_completed(&mut self) -> bool {
        if self.state == ReloadState::ReloadCompleted {
            self.state = ReloadState::Idle;
            return true;
        }
        false
    }
}
