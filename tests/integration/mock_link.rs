//! Mock connector for integration tests.
//!
//! Records every open, send, and close so tests can assert on the full
//! link history without touching a socket.  Opens can be refused or held
//! until released; sends can be made to fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use sensor_uplink::app::ports::{Connector, Link};
use sensor_uplink::notifier::StatusReceiver;
use sensor_uplink::{ConnectionStatus, Endpoint, StatusUpdate, UplinkConfig, UplinkError};

pub const WAIT: Duration = Duration::from_secs(3);

// ── Link call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    Open(Endpoint),
    Send(Vec<u8>),
    Close(Endpoint),
}

// ── Shared recorder ───────────────────────────────────────────

pub struct Recorder {
    calls: Mutex<Vec<LinkCall>>,
    refuse: AtomicBool,
    fail_sends: AtomicBool,
    hold_opens: AtomicBool,
    release: Signal<CriticalSectionRawMutex, ()>,
    opens_started: AtomicUsize,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            refuse: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            hold_opens: AtomicBool::new(false),
            release: Signal::new(),
            opens_started: AtomicUsize::new(0),
        }
    }
}

#[allow(dead_code)]
impl Recorder {
    fn record(&self, call: LinkCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<LinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn opens(&self) -> Vec<Endpoint> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LinkCall::Open(ep) => Some(ep),
                _ => None,
            })
            .collect()
    }

    pub fn sends(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LinkCall::Send(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<Endpoint> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LinkCall::Close(ep) => Some(ep),
                _ => None,
            })
            .collect()
    }

    /// Opens that entered `open()`, including held ones.
    pub fn opens_started(&self) -> usize {
        self.opens_started.load(Ordering::SeqCst)
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make the next `open()` block until [`release`](Self::release).
    pub fn hold_opens(&self) {
        self.hold_opens.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.hold_opens.store(false, Ordering::SeqCst);
        self.release.signal(());
    }

    /// Poll `check` until it holds or [`WAIT`] passes.
    pub fn wait_until(&self, check: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if check(self) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        check(self)
    }
}

// ── MockConnector ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockConnector {
    pub rec: Arc<Recorder>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connector for MockConnector {
    type Link = MockLink;

    fn open(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<MockLink, UplinkError> {
        self.rec.opens_started.fetch_add(1, Ordering::SeqCst);
        if self.rec.hold_opens.load(Ordering::SeqCst) {
            futures_lite::future::block_on(self.rec.release.wait());
        }
        if self.rec.refuse.load(Ordering::SeqCst) {
            return Err(UplinkError::ConnectRefused("Connection refused (os error 111)".into()));
        }
        self.rec.record(LinkCall::Open(endpoint.clone()));
        Ok(MockLink {
            rec: self.rec.clone(),
            endpoint: endpoint.clone(),
            open: true,
        })
    }
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    rec: Arc<Recorder>,
    endpoint: Endpoint,
    open: bool,
}

impl Link for MockLink {
    fn send(&mut self, record: &[u8]) -> Result<(), UplinkError> {
        if !self.open {
            return Err(UplinkError::NotConnected);
        }
        if self.rec.fail_sends.load(Ordering::SeqCst) {
            return Err(UplinkError::WriteFailure("Broken pipe (os error 32)".into()));
        }
        self.rec.record(LinkCall::Send(record.to_vec()));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.rec.record(LinkCall::Close(self.endpoint.clone()));
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Short tick so tests observe several sends quickly.
pub fn fast_config() -> UplinkConfig {
    UplinkConfig {
        send_interval_ms: 20,
        ..UplinkConfig::default()
    }
}

/// Next update, failing the test if none arrives in time.
pub fn next_update(rx: &StatusReceiver) -> StatusUpdate {
    rx.recv_timeout(WAIT)
        .unwrap_or_else(|| panic!("no status update within {WAIT:?}"))
}

/// Statuses of the next `n` updates.
pub fn next_statuses(rx: &StatusReceiver, n: usize) -> Vec<ConnectionStatus> {
    (0..n).map(|_| next_update(rx).status).collect()
}

/// Assert nothing further is published for a short while.
pub fn assert_quiet(rx: &StatusReceiver) {
    if let Some(extra) = rx.recv_timeout(Duration::from_millis(150)) {
        panic!("unexpected status update: {extra}");
    }
}
