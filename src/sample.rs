//! Telemetry channels and the samples producers report for them.

use core::fmt;
use core::str::FromStr;

use crate::error::UplinkError;

/// Largest arity of any channel.
pub const MAX_COMPONENTS: usize = 3;

/// Components of one reading, in channel order.
pub type Components = heapless::Vec<f64, MAX_COMPONENTS>;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Enumerated telemetry kind forwarded over the uplink.
///
/// The discriminant doubles as the slot index in
/// [`SampleStore`](crate::store::SampleStore) and fixes the key order of
/// the wire record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Channel {
    Location = 0,
    Accelerometer = 1,
    Orientation = 2,
    Light = 3,
}

impl Channel {
    /// Total number of channels; sizes the slot arrays.
    pub const COUNT: usize = 4;

    /// Every channel in wire order.
    pub const ALL: [Channel; Self::COUNT] = [
        Self::Location,
        Self::Accelerometer,
        Self::Orientation,
        Self::Light,
    ];

    /// Key used for this channel in the wire record.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Accelerometer => "Accelerometer",
            Self::Orientation => "Orientation",
            Self::Light => "Light",
        }
    }

    /// Number of components a reading carries: `[lat, lon]`, `[x, y, z]`
    /// or `[lux]`.
    pub const fn arity(self) -> usize {
        match self {
            Self::Location => 2,
            Self::Accelerometer | Self::Orientation => 3,
            Self::Light => 1,
        }
    }

    /// Single-value channels go on the wire as a bare number.
    pub const fn is_scalar(self) -> bool {
        self.arity() == 1
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = UplinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or(UplinkError::SampleInvalid("unknown channel"))
    }
}

// ---------------------------------------------------------------------------
// Location sentinels
// ---------------------------------------------------------------------------

/// Why a location fix could not be obtained.
///
/// Producers encode these as an out-of-band `[m, m]` Location reading; the
/// core forwards them like any other sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationFault {
    /// The provider raised an error while requesting updates.
    IoError,
    /// Location permission was not granted.
    PermissionDenied,
    /// Every location provider is disabled.
    ProviderDisabled,
}

impl LocationFault {
    pub const fn marker(self) -> f64 {
        match self {
            Self::IoError => -1.0,
            Self::PermissionDenied => -2.0,
            Self::ProviderDisabled => -3.0,
        }
    }

    fn from_marker(value: f64) -> Option<Self> {
        [Self::IoError, Self::PermissionDenied, Self::ProviderDisabled]
            .into_iter()
            .find(|f| f.marker() == value)
    }
}

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// One reading for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    channel: Channel,
    values: Components,
}

impl Sample {
    /// Build a sample from raw producer values.
    ///
    /// At least `channel.arity()` finite values are required; trailing
    /// extras are dropped (raw sensor event arrays are often longer than
    /// the channel needs).
    pub fn new(channel: Channel, values: &[f64]) -> Result<Self, UplinkError> {
        let arity = channel.arity();
        if values.len() < arity {
            return Err(UplinkError::SampleInvalid("too few components for channel"));
        }
        let values = &values[..arity];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(UplinkError::SampleInvalid("non-finite component"));
        }
        let mut components = Components::new();
        components
            .extend_from_slice(values)
            .map_err(|()| UplinkError::SampleInvalid("too many components"))?;
        Ok(Self {
            channel,
            values: components,
        })
    }

    /// The sentinel Location reading for `fault`.
    pub fn location_unavailable(fault: LocationFault) -> Self {
        let m = fault.marker();
        let mut values = Components::new();
        // Two components always fit.
        let _ = values.extend_from_slice(&[m, m]);
        Self {
            channel: Channel::Location,
            values,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Recognise a Location sentinel; `None` for real fixes and other channels.
    pub fn location_fault(&self) -> Option<LocationFault> {
        if self.channel != Channel::Location {
            return None;
        }
        match self.values.as_slice() {
            [a, b] if a == b => LocationFault::from_marker(*a),
            _ => None,
        }
    }
}
