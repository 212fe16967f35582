//! Periodic snapshot → encode → send loop.
//!
//! One `Dispatcher` exists per connected session and runs inline on that
//! session's worker thread.  Ticks are strictly serialized: the next wait
//! only starts once the previous send has returned.
//!
//! ```text
//!   ┌─────────────┐  snapshot  ┌────────┐  record  ┌──────┐
//!   │ SampleStore │──────────▶│ encode │────────▶│ Link │
//!   └─────────────┘            └────────┘          └──────┘
//!          ▲                                          │ error
//!      producers                         gate.fail("send failed: ..")
//! ```
//!
//! Between ticks the loop waits on an `async-io-mini` timer raced against
//! the session's [`StopSignal`], so `disconnect()` takes effect without
//! waiting out the interval.  A failed write is never retried.

use std::sync::Arc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, info, trace, warn};

use crate::app::ports::{Link, SessionGate};
use crate::codec::encode_record;
use crate::error::UplinkError;
use crate::store::{SampleStore, Snapshot};

/// Cooperative stop request for one session's dispatcher.
pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Store was empty; nothing written.
    Idle,
    /// One record of this many bytes was written.
    Sent(usize),
}

/// Why [`Dispatcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    /// Stop signal received.
    Stopped,
    /// The session stopped being current or left `Connected`.
    Revoked,
    /// Link found closed; `Failed` was requested.
    ConnectionLost,
    /// A write failed; `Failed` was requested.
    SendFailed,
}

/// Counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub records_sent: u64,
    pub bytes_sent: u64,
    pub ticks_skipped: u64,
}

pub struct Dispatcher<L: Link> {
    link: L,
    store: Arc<SampleStore>,
    interval: Duration,
    buf: Vec<u8>,
    stats: DispatchStats,
}

impl<L: Link> Dispatcher<L> {
    pub fn new(link: L, store: Arc<SampleStore>, interval: Duration) -> Self {
        Self {
            link,
            store,
            interval,
            buf: Vec::with_capacity(256),
            stats: DispatchStats::default(),
        }
    }

    /// Snapshot the store and write one record.  An empty store writes
    /// nothing.
    pub fn tick(&mut self) -> Result<TickOutcome, UplinkError> {
        let snapshot = self.store.snapshot();
        self.send_snapshot(&snapshot)
    }

    fn send_snapshot(&mut self, snapshot: &Snapshot) -> Result<TickOutcome, UplinkError> {
        if !encode_record(snapshot, &mut self.buf) {
            self.stats.ticks_skipped += 1;
            trace!("dispatcher: store empty, tick skipped");
            return Ok(TickOutcome::Idle);
        }

        debug!(
            "dispatcher: sending {}",
            String::from_utf8_lossy(&self.buf).trim_end()
        );
        self.link.send(&self.buf)?;

        self.stats.records_sent += 1;
        self.stats.bytes_sent += self.buf.len() as u64;
        Ok(TickOutcome::Sent(self.buf.len()))
    }

    /// Tick every `interval` until stopped, revoked, or broken.
    ///
    /// The first tick runs immediately.  On a write error the link is
    /// closed before `Failed` is requested through `gate`.
    pub async fn run(&mut self, gate: &impl SessionGate, stop: &StopSignal) -> DispatchExit {
        let interval = self.interval;
        info!("dispatcher: started, interval {:?}", interval);
        let exit = loop {
            if stop.signaled() {
                break DispatchExit::Stopped;
            }
            if !self.link.is_open() {
                gate.fail("connection lost".into());
                break DispatchExit::ConnectionLost;
            }

            // The gate is checked after the snapshot: a redirect that clears
            // the store first also revokes this session.
            let snapshot = self.store.snapshot();
            if !gate.may_send() {
                break DispatchExit::Revoked;
            }

            if let Err(e) = self.send_snapshot(&snapshot) {
                warn!("dispatcher: {}", e);
                self.link.close();
                gate.fail(format!("send failed: {e}"));
                break DispatchExit::SendFailed;
            }

            let stopped = future::or(
                async {
                    stop.wait().await;
                    true
                },
                async {
                    async_io_mini::Timer::after(interval).await;
                    false
                },
            )
            .await;
            if stopped {
                break DispatchExit::Stopped;
            }
        };

        info!(
            "dispatcher: exit {:?} after {} records ({} bytes, {} idle ticks)",
            exit, self.stats.records_sent, self.stats.bytes_sent, self.stats.ticks_skipped
        );
        exit
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}

impl<L: Link> Drop for Dispatcher<L> {
    fn drop(&mut self) {
        self.link.close();
    }
}
