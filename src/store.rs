//! Latest-value sample buffer shared between producers and the dispatcher.
//!
//! ```text
//!  location cb ──┐
//!  sensor cb   ──┼── put() ──▶ [ slot per Channel ] ──▶ snapshot() ──▶ Dispatcher
//!  sensor cb   ──┘                (one Mutex)
//! ```
//!
//! Each channel owns exactly one slot, so a write always replaces and
//! never accumulates.  The lock is held only for a slot write or a copy
//! of four small values; producers never wait on serialization or I/O.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::sample::{Channel, Sample};

type Slots = [Option<Sample>; Channel::COUNT];

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of the latest sample per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    slots: Slots,
}

impl Snapshot {
    pub fn get(&self, channel: Channel) -> Option<&Sample> {
        self.slots[channel.index()].as_ref()
    }

    pub fn insert(&mut self, sample: Sample) {
        let idx = sample.channel().index();
        self.slots[idx] = Some(sample);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Present samples in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.slots.iter().flatten()
    }
}

// ---------------------------------------------------------------------------
// SampleStore
// ---------------------------------------------------------------------------

/// Thread-safe latest-value buffer keyed by [`Channel`].
#[derive(Debug, Default)]
pub struct SampleStore {
    slots: Mutex<Slots>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the latest value for the sample's channel.
    pub fn put(&self, sample: Sample) {
        let idx = sample.channel().index();
        self.lock()[idx] = Some(sample);
    }

    /// Consistent copy of every slot.  A concurrent `put` is either fully
    /// visible or not visible at all.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            slots: self.lock().clone(),
        }
    }

    /// Drop every stored sample (new connection attempt or teardown).
    pub fn clear(&self) {
        *self.lock() = Slots::default();
    }

    pub fn is_empty(&self) -> bool {
        self.lock().iter().all(Option::is_none)
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // A producer that panicked mid-write cannot leave a torn slot:
        // the slot assignment is a single move.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Producer surface
// ---------------------------------------------------------------------------

/// Cloneable handle that sensor and location callbacks use to report
/// readings.  Fire-and-forget: invalid readings are logged and dropped.
#[derive(Debug, Clone)]
pub struct SampleReporter {
    store: Arc<SampleStore>,
}

impl SampleReporter {
    pub fn new(store: Arc<SampleStore>) -> Self {
        Self { store }
    }

    pub fn report(&self, channel: Channel, values: &[f64]) {
        match Sample::new(channel, values) {
            Ok(sample) => self.store.put(sample),
            Err(e) => debug!("dropping {} reading: {}", channel, e),
        }
    }

    pub fn report_sample(&self, sample: Sample) {
        self.store.put(sample);
    }
}
