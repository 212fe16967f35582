//! Log-based status sink adapter.
//!
//! Implements [`StatusObserver`] by writing one `STATUS` line per
//! notification through the `log` facade.  A UI panel would implement
//! the same trait and render the message as status text.

use log::{info, warn};

use crate::app::events::StatusUpdate;
use crate::app::ports::StatusObserver;
use crate::fsm::ConnectionStatus;

/// Adapter that logs every [`StatusUpdate`].
#[derive(Debug, Default)]
pub struct LogStatusSink {
    seen: u64,
}

impl LogStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl StatusObserver for LogStatusSink {
    fn on_status(&mut self, update: &StatusUpdate) {
        self.seen += 1;
        match update.status {
            ConnectionStatus::Failed => {
                warn!("STATUS | {} | {}", update.status, update.message);
            }
            _ => {
                info!("STATUS | {} | {}", update.status, update.message);
            }
        }
    }
}
