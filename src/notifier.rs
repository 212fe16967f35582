//! Status fan-out to external observers.
//!
//! Two kinds of observer attach here:
//!
//! - **Callback observers** ([`StatusObserver`]) run inline on the
//!   publishing thread.  They must return quickly (the log sink does).
//!   One that panics is caught and detached.
//! - **Queue subscribers** ([`StatusReceiver`]) each own a bounded
//!   `embassy-sync` channel.  Publishing uses `try_send`, so a slow or
//!   absent reader never blocks the core; an overflowing queue loses the
//!   newest update for that subscriber only, with a warning.
//!
//! ```text
//!                      ┌──▶ LogStatusSink (inline)
//!  ConnectionFsm ──▶ publish ──▶ queue ──▶ StatusReceiver (UI thread)
//!                      └──▶ queue ──▶ StatusReceiver (test)
//! ```
//!
//! History is not replayed: an observer that attaches late must query the
//! current status itself.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future;
use log::warn;

use crate::app::events::StatusUpdate;
use crate::app::ports::StatusObserver;

/// Queue depth per subscriber.
pub const STATUS_QUEUE_DEPTH: usize = 32;

type StatusQueue = Channel<CriticalSectionRawMutex, StatusUpdate, STATUS_QUEUE_DEPTH>;

// ───────────────────────────────────────────────────────────────
// StatusNotifier
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StatusNotifier {
    observers: Vec<Box<dyn StatusObserver>>,
    queues: Vec<Arc<StatusQueue>>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an inline callback observer.
    pub fn attach(&mut self, observer: impl StatusObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Create a new queue subscriber.  It sees every update published
    /// from now on.
    pub fn subscribe(&mut self) -> StatusReceiver {
        let queue = Arc::new(StatusQueue::new());
        self.queues.push(queue.clone());
        StatusReceiver { queue }
    }

    /// Fire-and-forget delivery to every observer.
    ///
    /// A callback observer that panics is detached; the update still
    /// reaches everyone else.
    pub fn publish(&mut self, update: &StatusUpdate) {
        self.observers.retain_mut(|observer| {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| observer.on_status(update))).is_ok();
            if !delivered {
                warn!("status observer panicked on {}, detached", update.status.name());
            }
            delivered
        });

        // Receivers that were dropped leave us holding the only reference.
        self.queues.retain(|q| Arc::strong_count(q) > 1);
        for queue in &self.queues {
            if queue.try_send(update.clone()).is_err() {
                warn!(
                    "status queue full, subscriber missed {}",
                    update.status.name()
                );
            }
        }
    }

    /// Attached observers plus live subscribers.
    pub fn observer_count(&self) -> usize {
        self.observers.len() + self.queues.iter().filter(|q| Arc::strong_count(q) > 1).count()
    }
}

// ───────────────────────────────────────────────────────────────
// StatusReceiver
// ───────────────────────────────────────────────────────────────

/// Receiving half of one subscription.  Dropping it detaches.
pub struct StatusReceiver {
    queue: Arc<StatusQueue>,
}

impl StatusReceiver {
    /// Next pending update, if any.
    pub fn try_recv(&self) -> Option<StatusUpdate> {
        self.queue.try_receive().ok()
    }

    /// Wait for the next update.
    pub async fn recv(&self) -> StatusUpdate {
        self.queue.receive().await
    }

    /// Block the calling thread until an update arrives or `timeout`
    /// passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusUpdate> {
        future::block_on(future::or(async { Some(self.recv().await) }, async {
            async_io_mini::Timer::after(timeout).await;
            None
        }))
    }

    /// Take everything currently queued.
    pub fn drain(&self) -> Vec<StatusUpdate> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
