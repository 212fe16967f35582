//! Sensor telemetry uplink library.
//!
//! Streams the latest sensor and location readings to a remote TCP
//! endpoint on a fixed cadence, one newline-terminated JSON record per
//! tick, and reports every connection state change to observers.
//!
//! ```text
//!  producers ──▶ SampleStore ──▶ Dispatcher ──▶ Link ──▶ remote
//!                                    ▲
//!  Connect/Disconnect ──▶ Uplink ── ConnectionFsm ──▶ StatusNotifier
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod archive;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod fsm;
pub mod notifier;
pub mod sample;
pub mod store;

pub use app::commands::UplinkCommand;
pub use app::events::StatusUpdate;
pub use app::service::Uplink;
pub use config::UplinkConfig;
pub use endpoint::Endpoint;
pub use error::UplinkError;
pub use fsm::ConnectionStatus;
pub use sample::{Channel, LocationFault, Sample};
