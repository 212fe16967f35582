//! Table-driven connection lifecycle state machine.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌──────────────┬─────────────────────┬──────────┬──────────┐  │
//! │  │ Status       │ successors           │ may_send │ on_enter │  │
//! │  ├──────────────┼─────────────────────┼──────────┼──────────┤  │
//! │  │ Disconnected │ Connecting           │ no       │ fn(upd)  │  │
//! │  │ Connecting   │ Connected, Failed,   │ no       │ fn(upd)  │  │
//! │  │              │ Disconnected         │          │          │  │
//! │  │ Connected    │ Disconnected, Failed │ yes      │ fn(upd)  │  │
//! │  │ Failed       │ Connecting           │ no       │ fn(upd)  │  │
//! │  └──────────────┴─────────────────────┴──────────┴──────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`ConnectionFsm`] is the only owner of the current status.  Every
//! accepted transition updates the status, runs the target's `on_enter`,
//! and publishes exactly one [`StatusUpdate`] before returning.  Rejected
//! transitions change nothing and publish nothing.

pub mod states;

use core::fmt;

use log::info;

use crate::app::events::StatusUpdate;
use crate::error::UplinkError;
use crate::notifier::StatusNotifier;

// ---------------------------------------------------------------------------
// Status identity
// ---------------------------------------------------------------------------

/// Connection lifecycle status.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Failed = 3,
}

impl ConnectionStatus {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Failed,
    ];

    /// Convert an index back to a status.  Panics on out-of-range in
    /// debug builds; returns `Disconnected` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Failed,
            _ => {
                debug_assert!(false, "invalid status index: {idx}");
                Self::Disconnected
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Failed => "Failed",
        }
    }

    /// `Connecting` or `Connected`: a session exists.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Runs once each time a status is entered, after it became current.
pub type EnterFn = fn(&StatusUpdate);

/// Static descriptor for a single status.
pub struct StateDescriptor {
    pub id: ConnectionStatus,
    pub name: &'static str,
    /// Status text used when a transition carries no message.
    pub default_message: &'static str,
    /// Legal targets from this status.
    pub successors: &'static [ConnectionStatus],
    /// Whether the dispatcher may write while in this status.
    pub may_send: bool,
    pub on_enter: Option<EnterFn>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct ConnectionFsm {
    /// Fixed-size table indexed by `ConnectionStatus as usize`.
    table: [StateDescriptor; ConnectionStatus::COUNT],
    current: usize,
    message: String,
    notifier: StatusNotifier,
    transition_count: u64,
}

impl ConnectionFsm {
    /// Start in `Disconnected`.  Nothing is published for the initial
    /// status.
    pub fn new(notifier: StatusNotifier) -> Self {
        let table = states::build_state_table();
        let message = table[ConnectionStatus::Disconnected as usize]
            .default_message
            .to_owned();
        Self {
            table,
            current: ConnectionStatus::Disconnected as usize,
            message,
            notifier,
            transition_count: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_index(self.current)
    }

    /// Text of the most recent transition.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn current_update(&self) -> StatusUpdate {
        StatusUpdate::new(self.status(), self.message.clone())
    }

    pub fn can_transition(&self, to: ConnectionStatus) -> bool {
        self.table[self.current].successors.contains(&to)
    }

    /// Whether the current status permits writing.
    pub fn may_send(&self) -> bool {
        self.table[self.current].may_send
    }

    /// Move to `to`, publishing exactly one update.
    ///
    /// An empty `message` falls back to the target's default text.
    pub fn transition(
        &mut self,
        to: ConnectionStatus,
        message: impl Into<String>,
    ) -> Result<(), UplinkError> {
        let from = self.status();
        if !self.can_transition(to) {
            return Err(UplinkError::IllegalTransition { from, to });
        }

        let target = &self.table[to as usize];
        let mut message = message.into();
        if message.is_empty() {
            message.push_str(target.default_message);
        }

        info!("uplink: {} -> {} ({})", from.name(), target.name, message);

        self.current = to as usize;
        self.message = message;
        self.transition_count += 1;

        let update = self.current_update();
        if let Some(enter) = self.table[self.current].on_enter {
            enter(&update);
        }
        self.notifier.publish(&update);
        Ok(())
    }

    /// Publish the current status again without changing it.
    pub fn announce(&mut self) {
        let update = self.current_update();
        self.notifier.publish(&update);
    }

    pub fn notifier_mut(&mut self) -> &mut StatusNotifier {
        &mut self.notifier
    }

    /// Accepted transitions since construction.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }
}
