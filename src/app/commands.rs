//! Inbound commands to the uplink.
//!
//! These represent actions requested by the outside world (a connect form,
//! a CLI, a test) that the [`Uplink`](super::service::Uplink) interprets
//! and acts upon.

use crate::endpoint::Endpoint;

/// Control-surface requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UplinkCommand {
    /// Start streaming to `endpoint`, or redirect an active uplink to it.
    Connect(Endpoint),

    /// Stop sending and tear the connection down.
    Disconnect,
}
