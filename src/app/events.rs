//! Outbound status events.
//!
//! The state machine publishes one [`StatusUpdate`] per transition through
//! the [`StatusNotifier`](crate::notifier::StatusNotifier).  Observers on
//! the other side decide what to do with it: log it, render status text,
//! toggle a connect button.

use core::fmt;

use crate::fsm::ConnectionStatus;

/// Authoritative status plus the human-readable text to show for it.
///
/// Observers treat every update as the full current state, not a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: ConnectionStatus,
    pub message: String,
}

impl StatusUpdate {
    pub fn new(status: ConnectionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.status.name(), self.message)
    }
}
