//! Simulated sensor and location producers.
//!
//! Stands in for the device's sensor and location callbacks in the demo
//! binary.  Each channel runs on its own thread and pushes through a
//! shared [`SampleReporter`], so producers overlap the way real callbacks
//! do.  Readings are deterministic functions of elapsed time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::sample::{Channel, LocationFault, Sample};
use crate::store::SampleReporter;

/// Mountain View, roughly.
const HOME: (f64, f64) = (37.422, -122.084);
const GRAVITY: f64 = 9.81;

/// Deterministic synthetic source for every channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimSensors {
    /// Every n-th location fix reports `ProviderDisabled` instead.
    pub location_dropout_every: u32,
}

impl SimSensors {
    /// Raw event array for `channel`, the way a platform callback hands
    /// it over.  Motion sensors carry a trailing timestamp component.
    pub fn raw(&self, channel: Channel, t: f64) -> Vec<f64> {
        match channel {
            Channel::Location => {
                let drift = t * 1e-5;
                vec![HOME.0 + drift, HOME.1 - drift]
            }
            Channel::Accelerometer => vec![0.1 * (t * 2.0).sin(), GRAVITY, 0.05 * t.cos(), t],
            Channel::Orientation => vec![(t * 10.0) % 360.0, 2.0 * t.sin(), -1.5, t],
            Channel::Light => vec![400.0 + 25.0 * (t / 3.0).sin()],
        }
    }

    /// Push one reading for `channel` at tick `n`.
    pub fn report(&self, reporter: &SampleReporter, channel: Channel, n: u32, t: f64) {
        let dropout = channel == Channel::Location
            && self.location_dropout_every != 0
            && n % self.location_dropout_every == self.location_dropout_every - 1;
        if dropout {
            debug!("sim: location provider disabled at tick {}", n);
            reporter.report_sample(Sample::location_unavailable(LocationFault::ProviderDisabled));
        } else {
            reporter.report(channel, &self.raw(channel, t));
        }
    }

    /// One producer thread per channel, each reporting every `period`
    /// until `running` is cleared.
    pub fn spawn(
        self,
        reporter: &SampleReporter,
        period: Duration,
        running: &Arc<AtomicBool>,
    ) -> Vec<JoinHandle<()>> {
        Channel::ALL
            .into_iter()
            .filter_map(|channel| {
                let reporter = reporter.clone();
                let running = running.clone();
                let spawned = thread::Builder::new()
                    .name(format!("sim-{}", channel.name().to_lowercase()))
                    .spawn(move || {
                        let mut n = 0u32;
                        while running.load(Ordering::Relaxed) {
                            let t = f64::from(n) * period.as_secs_f64();
                            self.report(&reporter, channel, n, t);
                            n = n.wrapping_add(1);
                            thread::sleep(period);
                        }
                    });
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!("sim: cannot start {} producer: {}", channel, e);
                        None
                    }
                }
            })
            .collect()
    }
}
