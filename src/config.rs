//! Uplink configuration parameters
//!
//! All tunable timing for the uplink.  Every field has a default, so a
//! config file only needs the values it overrides.

use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::UplinkError;

/// Core uplink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    // --- Dispatcher ---
    /// Period between send ticks (milliseconds)
    pub send_interval_ms: u32,

    // --- Socket ---
    /// Upper bound on a blocking connect (milliseconds)
    pub connect_timeout_ms: u32,
    /// Upper bound on a single blocked write (milliseconds)
    pub write_timeout_ms: u32,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: 1000,    // 1 Hz
            connect_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
        }
    }
}

impl UplinkConfig {
    pub fn validate(&self) -> Result<(), UplinkError> {
        if self.send_interval_ms == 0 {
            return Err(UplinkError::Config("send_interval_ms must be > 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(UplinkError::Config("connect_timeout_ms must be > 0"));
        }
        if self.write_timeout_ms == 0 {
            return Err(UplinkError::Config("write_timeout_ms must be > 0"));
        }
        Ok(())
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, UplinkError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            warn!("config: cannot read {}: {}", path.display(), e);
            UplinkError::Config("config file unreadable")
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            warn!("config: {} is not valid: {}", path.display(), e);
            UplinkError::Config("config file malformed")
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("config: {}, using defaults", e);
            Self::default()
        })
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.send_interval_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.connect_timeout_ms))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.write_timeout_ms))
    }
}
