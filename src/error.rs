//! Unified error types for the uplink core.
//!
//! Every fallible operation in the uplink funnels into [`UplinkError`].
//! The control surface never lets one escape as a fault: the service
//! absorbs connect and write failures and turns them into a `Failed`
//! status transition carrying the error's `Display` text.

use core::fmt;
use std::io;

use crate::fsm::ConnectionStatus;

// ---------------------------------------------------------------------------
// Top-level uplink error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UplinkError {
    /// Host or port from the control surface is malformed.
    EndpointInvalid(&'static str),
    /// `open()` did not complete within its timeout.
    ConnectTimeout(String),
    /// The remote actively refused the connection.
    ConnectRefused(String),
    /// Name resolution or any other connect-side I/O failure.
    ConnectFailed(String),
    /// Mid-stream write error or pending socket error.
    WriteFailure(String),
    /// Operation requires an open link but none is present.
    NotConnected,
    /// A producer handed in a reading that cannot be forwarded.
    SampleInvalid(&'static str),
    /// The transition table does not allow `from -> to`.
    IllegalTransition {
        from: ConnectionStatus,
        to: ConnectionStatus,
    },
    /// Configuration value out of range.
    Config(&'static str),
    /// The session worker thread could not be created.
    WorkerSpawn(String),
}

impl fmt::Display for UplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndpointInvalid(msg) => write!(f, "invalid endpoint: {msg}"),
            Self::ConnectTimeout(msg) => write!(f, "connect timed out: {msg}"),
            Self::ConnectRefused(msg) => write!(f, "connection refused: {msg}"),
            Self::ConnectFailed(msg) => write!(f, "connect failed: {msg}"),
            Self::WriteFailure(msg) => write!(f, "write failed: {msg}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::SampleInvalid(msg) => write!(f, "invalid sample: {msg}"),
            Self::IllegalTransition { from, to } => {
                write!(f, "illegal transition {} -> {}", from.name(), to.name())
            }
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::WorkerSpawn(msg) => write!(f, "worker spawn failed: {msg}"),
        }
    }
}

impl std::error::Error for UplinkError {}

impl UplinkError {
    /// Classify an `io::Error` raised while establishing a connection.
    pub fn from_connect(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Self::ConnectTimeout(err.to_string())
            }
            io::ErrorKind::ConnectionRefused => Self::ConnectRefused(err.to_string()),
            _ => Self::ConnectFailed(err.to_string()),
        }
    }

    /// Normalise any write-side `io::Error` into [`UplinkError::WriteFailure`].
    pub fn from_write(err: &io::Error) -> Self {
        Self::WriteFailure(err.to_string())
    }
}
