//! Sensor Uplink — demo client.
//!
//! Streams simulated sensor and location readings to a remote endpoint.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  TcpConnector      LogStatusSink    SimSensors                 │
//! │  (Connector+Link)  (StatusObserver) (producer threads)         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │                 Uplink (pure logic)                    │    │
//! │  │  ConnectionFsm · SampleStore · Dispatcher              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `sensor-uplink <host:port> [config.json]`
//!
//! Runs until the uplink fails or the remote side goes away.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use sensor_uplink::adapters::log_sink::LogStatusSink;
use sensor_uplink::adapters::sim_sensors::SimSensors;
use sensor_uplink::adapters::tcp::TcpConnector;
use sensor_uplink::{ConnectionStatus, Endpoint, Uplink, UplinkConfig};

/// How often each simulated sensor fires.
const SENSOR_PERIOD: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Sensor Uplink v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Arguments + config ─────────────────────────────────
    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        bail!("usage: sensor-uplink <host:port> [config.json]");
    };
    let endpoint: Endpoint = target
        .parse()
        .with_context(|| format!("bad endpoint {target:?}"))?;
    let config = match args.next() {
        Some(path) => UplinkConfig::load_or_default(path),
        None => UplinkConfig::default(),
    };

    // ── 3. Wire adapters ──────────────────────────────────────
    let uplink = Uplink::new(TcpConnector::new(config.write_timeout()), config)
        .context("uplink init")?;
    uplink.add_observer(LogStatusSink::new());
    let status = uplink.subscribe();

    let running = Arc::new(AtomicBool::new(true));
    let producers = SimSensors {
        location_dropout_every: 50,
    }
    .spawn(&uplink.reporter(), SENSOR_PERIOD, &running);

    // ── 4. Run until the session ends ─────────────────────────
    uplink.connect(endpoint).context("connect")?;

    let mut was_connected = false;
    let outcome = loop {
        let Some(update) = status.recv_timeout(Duration::from_secs(1)) else {
            continue;
        };
        match update.status {
            ConnectionStatus::Connected => was_connected = true,
            ConnectionStatus::Failed => break Err(update.message),
            ConnectionStatus::Disconnected if was_connected => break Ok(()),
            _ => {}
        }
    };

    // ── 5. Shutdown ───────────────────────────────────────────
    running.store(false, Ordering::Relaxed);
    for producer in producers {
        if producer.join().is_err() {
            warn!("sensor producer panicked");
        }
    }
    drop(uplink);

    match outcome {
        Ok(()) => Ok(()),
        Err(message) => bail!("uplink ended: {message}"),
    }
}
