//! Port traits — the hexagonal boundary between the uplink core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Uplink (core)
//! ```
//!
//! Driven adapters (sockets, status observers) implement these traits.
//! The [`Uplink`](super::service::Uplink) consumes them via generics, so
//! the core never touches a socket type directly and every path can be
//! exercised against mocks.

use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::UplinkError;

use super::events::StatusUpdate;

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: core → remote endpoint)
// ───────────────────────────────────────────────────────────────

/// One open, writable uplink stream.
///
/// Owned by exactly one session worker; never shared.
pub trait Link: Send {
    /// Write one complete, newline-terminated record.
    ///
    /// Raised I/O errors and silent stream-error flags must both come back
    /// as [`UplinkError::WriteFailure`].
    fn send(&mut self, record: &[u8]) -> Result<(), UplinkError>;

    /// False once the link was closed or found broken.
    fn is_open(&self) -> bool;

    /// Best-effort, idempotent release.  Errors from an already-broken
    /// stream are swallowed.
    fn close(&mut self);
}

/// Opens [`Link`]s.  Shared by every session of one uplink.
pub trait Connector: Send + Sync + 'static {
    type Link: Link + 'static;

    /// Blocking connect bounded by `timeout`.
    fn open(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Self::Link, UplinkError>;
}

// ───────────────────────────────────────────────────────────────
// Status observer port (driven adapter: core → UI / logging)
// ───────────────────────────────────────────────────────────────

/// Inline status callback.  Runs on whichever thread drove the transition
/// and must not block.
pub trait StatusObserver: Send {
    fn on_status(&mut self, update: &StatusUpdate);
}

// ───────────────────────────────────────────────────────────────
// Session gate (dispatcher → state machine)
// ───────────────────────────────────────────────────────────────

/// The dispatcher's only view of the state machine.  It may ask whether
/// it is still allowed to send and may request a failure transition; it
/// never mutates status directly.
pub trait SessionGate {
    /// True while this session is current and the status is `Connected`.
    fn may_send(&self) -> bool;

    /// Request `Connected -> Failed` for this session.  Ignored when the
    /// session was already superseded or torn down.
    fn fail(&self, reason: String);
}
