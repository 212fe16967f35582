//! Uplink service — the hexagonal core.
//!
//! [`Uplink`] owns the connection state machine, the sample store, and at
//! most one live session.  Every connect attempt gets a session id and a
//! dedicated worker thread that opens the link and then runs the
//! [`Dispatcher`] inline until stopped or broken.
//!
//! ```text
//!  Connect/Disconnect ──▶ ┌──────────────────────────┐ ──▶ StatusObserver
//!                         │          Uplink           │
//!  ReportSample ────────▶ │  FSM · SampleStore · id   │ ──▶ StatusReceiver
//!                         └────────────┬─────────────┘
//!                                      │ spawn "uplink-{id}"
//!                         open() ─▶ Dispatcher::run ─▶ Link
//! ```
//!
//! Workers only ever request transitions for their own session id.  Once a
//! session is superseded (disconnect or redirect) its worker can no longer
//! touch the state machine; it closes its socket and exits quietly.
//!
//! Inline observers run while the control lock is held and must not call
//! back into the `Uplink`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use futures_lite::future;
use log::{debug, info, warn};

use crate::config::UplinkConfig;
use crate::dispatcher::{Dispatcher, StopSignal};
use crate::endpoint::Endpoint;
use crate::error::UplinkError;
use crate::fsm::{ConnectionFsm, ConnectionStatus};
use crate::notifier::{StatusNotifier, StatusReceiver};
use crate::sample::Channel;
use crate::store::{SampleReporter, SampleStore};

use super::commands::UplinkCommand;
use super::events::StatusUpdate;
use super::ports::{Connector, Link, SessionGate, StatusObserver};

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

struct Session {
    id: u64,
    endpoint: Endpoint,
    stop: Arc<StopSignal>,
    worker: Option<JoinHandle<()>>,
}

struct Control {
    fsm: ConnectionFsm,
    session: Option<Session>,
    /// Workers of superseded sessions, joined on drop.
    retired: Vec<JoinHandle<()>>,
    next_id: u64,
}

impl Control {
    fn is_current(&self, id: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == id)
    }

    fn retire_session(&mut self) -> Option<Session> {
        let mut session = self.session.take()?;
        session.stop.signal(());
        if let Some(worker) = session.worker.take() {
            self.retired.push(worker);
        }
        Some(session)
    }

    fn transition(&mut self, to: ConnectionStatus, message: String) {
        if let Err(e) = self.fsm.transition(to, message) {
            warn!("uplink: {}", e);
        }
    }
}

struct Shared<C: Connector> {
    control: Mutex<Control>,
    store: Arc<SampleStore>,
    connector: C,
    config: UplinkConfig,
}

impl<C: Connector> Shared<C> {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tear down the current session and move to `Disconnected`.
    fn teardown(&self, ctl: &mut Control, message: &str) {
        if let Some(session) = ctl.retire_session() {
            debug!("uplink: session {} to {} retired", session.id, session.endpoint);
        }
        self.store.clear();
        ctl.transition(ConnectionStatus::Disconnected, message.to_owned());
    }

    /// Move session `id` to `Failed`, if it is still current.
    fn fail_session(&self, ctl: &mut Control, id: u64, reason: String) {
        if !ctl.is_current(id) {
            debug!("uplink: stale session {} failure ignored: {}", id, reason);
            return;
        }
        ctl.retire_session();
        self.store.clear();
        ctl.transition(ConnectionStatus::Failed, reason);
    }
}

// ───────────────────────────────────────────────────────────────
// Session gate handed to the dispatcher
// ───────────────────────────────────────────────────────────────

struct SessionHandle<'a, C: Connector> {
    shared: &'a Shared<C>,
    id: u64,
}

impl<C: Connector> SessionGate for SessionHandle<'_, C> {
    fn may_send(&self) -> bool {
        let ctl = self.shared.lock();
        ctl.is_current(self.id) && ctl.fsm.may_send()
    }

    fn fail(&self, reason: String) {
        let mut ctl = self.shared.lock();
        if ctl.fsm.status() == ConnectionStatus::Connected {
            self.shared.fail_session(&mut ctl, self.id, reason);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Session worker
// ───────────────────────────────────────────────────────────────

fn run_session<C: Connector>(
    shared: Arc<Shared<C>>,
    id: u64,
    endpoint: Endpoint,
    stop: Arc<StopSignal>,
) {
    let opened = shared
        .connector
        .open(&endpoint, shared.config.connect_timeout());

    let link = {
        let mut ctl = shared.lock();
        if !ctl.is_current(id) {
            drop(ctl);
            debug!("uplink: session {} superseded before connect finished", id);
            if let Ok(mut link) = opened {
                link.close();
            }
            return;
        }
        match opened {
            Ok(link) => {
                ctl.transition(ConnectionStatus::Connected, format!("connected to {endpoint}"));
                link
            }
            Err(e) => {
                shared.fail_session(&mut ctl, id, format!("connection failed: {e}"));
                return;
            }
        }
    };

    let mut dispatcher = Dispatcher::new(link, shared.store.clone(), shared.config.send_interval());
    let gate = SessionHandle {
        shared: &shared,
        id,
    };
    future::block_on(dispatcher.run(&gate, &stop));
}

// ───────────────────────────────────────────────────────────────
// Uplink
// ───────────────────────────────────────────────────────────────

/// Control, producer, and observation surface of one uplink.
pub struct Uplink<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Uplink<C> {
    pub fn new(connector: C, config: UplinkConfig) -> Result<Self, UplinkError> {
        config.validate()?;
        info!(
            "uplink: interval {}ms, connect timeout {}ms",
            config.send_interval_ms, config.connect_timeout_ms
        );
        let control = Control {
            fsm: ConnectionFsm::new(StatusNotifier::new()),
            session: None,
            retired: Vec::new(),
            next_id: 1,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                control: Mutex::new(control),
                store: Arc::new(SampleStore::new()),
                connector,
                config,
            }),
        })
    }

    // ── Control surface ───────────────────────────────────────

    /// Start streaming to `endpoint`, or redirect to it.
    ///
    /// - same endpoint while `Connecting`: nothing happens
    /// - same endpoint while `Connected`: status is re-announced once
    /// - other endpoint while active: `Disconnected`, then `Connecting`
    ///
    /// The only error is a failure to spawn the worker, which also lands
    /// the status in `Failed`.
    pub fn connect(&self, endpoint: Endpoint) -> Result<(), UplinkError> {
        let mut ctl = self.shared.lock();
        ctl.retired.retain(|worker| !worker.is_finished());

        let status = ctl.fsm.status();
        if status.is_active() {
            let same = ctl.session.as_ref().is_some_and(|s| s.endpoint == endpoint);
            if same {
                if status == ConnectionStatus::Connected {
                    ctl.fsm.announce();
                }
                debug!("uplink: already {} to {}", status, endpoint);
                return Ok(());
            }
            info!("uplink: redirecting to {}", endpoint);
            self.shared.teardown(&mut ctl, "disconnected");
        }

        let id = ctl.next_id;
        ctl.next_id += 1;
        self.shared.store.clear();
        ctl.transition(ConnectionStatus::Connecting, format!("connecting to {endpoint}..."));

        let stop = Arc::new(StopSignal::new());
        let spawned = thread::Builder::new().name(format!("uplink-{id}")).spawn({
            let shared = self.shared.clone();
            let endpoint = endpoint.clone();
            let stop = stop.clone();
            move || run_session(shared, id, endpoint, stop)
        });

        match spawned {
            Ok(worker) => {
                ctl.session = Some(Session {
                    id,
                    endpoint,
                    stop,
                    worker: Some(worker),
                });
                Ok(())
            }
            Err(e) => {
                let err = UplinkError::WorkerSpawn(e.to_string());
                ctl.transition(ConnectionStatus::Failed, format!("connection failed: {err}"));
                Err(err)
            }
        }
    }

    /// Parse `host:port` and connect.  A malformed address leaves the
    /// status untouched.
    pub fn connect_to(&self, addr: &str) -> Result<(), UplinkError> {
        self.connect(addr.parse()?)
    }

    /// Stop sending and tear the connection down.  Always safe; a no-op
    /// unless `Connecting` or `Connected`.
    pub fn disconnect(&self) {
        let mut ctl = self.shared.lock();
        if ctl.fsm.status().is_active() {
            self.shared.teardown(&mut ctl, "disconnected");
        }
    }

    pub fn handle_command(&self, command: UplinkCommand) -> Result<(), UplinkError> {
        match command {
            UplinkCommand::Connect(endpoint) => self.connect(endpoint),
            UplinkCommand::Disconnect => {
                self.disconnect();
                Ok(())
            }
        }
    }

    // ── Producer surface ──────────────────────────────────────

    /// Fire-and-forget; invalid readings are logged and dropped.
    pub fn report_sample(&self, channel: Channel, values: &[f64]) {
        self.reporter().report(channel, values);
    }

    /// Cloneable producer handle for sensor callbacks on other threads.
    pub fn reporter(&self) -> SampleReporter {
        SampleReporter::new(self.shared.store.clone())
    }

    // ── Observation surface ───────────────────────────────────

    /// Queue subscriber.  Sees only updates published after this call.
    pub fn subscribe(&self) -> StatusReceiver {
        self.shared.lock().fsm.notifier_mut().subscribe()
    }

    /// Inline callback observer.
    pub fn add_observer(&self, observer: impl StatusObserver + 'static) {
        self.shared.lock().fsm.notifier_mut().attach(observer);
    }

    pub fn status(&self) -> StatusUpdate {
        self.shared.lock().fsm.current_update()
    }

    /// Target of the current session, if any.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.shared.lock().session.as_ref().map(|s| s.endpoint.clone())
    }

    pub fn store(&self) -> &SampleStore {
        &self.shared.store
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.shared.config
    }
}

impl<C: Connector> Drop for Uplink<C> {
    fn drop(&mut self) {
        self.disconnect();
        let workers = std::mem::take(&mut self.shared.lock().retired);
        for worker in workers {
            if worker.join().is_err() {
                warn!("uplink: session worker panicked");
            }
        }
    }
}
