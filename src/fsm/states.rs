//! Transition table and enter hooks.
//!
//! ```text
//!  DISCONNECTED ──[connect]──▶ CONNECTING ──[socket up]──▶ CONNECTED
//!       ▲                        │    │                       │  │
//!       │                  [disconnect] [open error]          │  │
//!       │                        │    ▼                       │  │
//!       └────────────────────────┘  FAILED ◀──[write error]───┘  │
//!       │                             │                          │
//!       │                        [connect]──▶ CONNECTING         │
//!       └───────────────────[disconnect / redirect]──────────────┘
//! ```

use super::{ConnectionStatus, StateDescriptor};
use crate::app::events::StatusUpdate;
use log::{debug, warn};

use ConnectionStatus::*;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per state machine.
pub fn build_state_table() -> [StateDescriptor; ConnectionStatus::COUNT] {
    [
        // Index 0 — Disconnected
        StateDescriptor {
            id: Disconnected,
            name: "Disconnected",
            default_message: "disconnected",
            successors: &[Connecting],
            may_send: false,
            on_enter: Some(disconnected_enter),
        },
        // Index 1 — Connecting
        StateDescriptor {
            id: Connecting,
            name: "Connecting",
            default_message: "connecting...",
            successors: &[Connected, Failed, Disconnected],
            may_send: false,
            on_enter: None,
        },
        // Index 2 — Connected
        StateDescriptor {
            id: Connected,
            name: "Connected",
            default_message: "connected",
            successors: &[Disconnected, Failed],
            may_send: true,
            on_enter: None,
        },
        // Index 3 — Failed
        StateDescriptor {
            id: Failed,
            name: "Failed",
            default_message: "connection failed",
            successors: &[Connecting],
            may_send: false,
            on_enter: Some(failed_enter),
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Enter hooks
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_enter(_update: &StatusUpdate) {
    debug!("uplink idle, dispatcher stopped");
}

fn failed_enter(update: &StatusUpdate) {
    warn!("uplink failed: {}", update.message);
}
