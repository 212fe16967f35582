//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `tcp`          | Connector, Link    | Remote TCP endpoint      |
//! | `log_sink`     | StatusObserver     | `log` output             |
//! | `sim_sensors`  | (producer)         | SampleReporter           |

pub mod log_sink;
pub mod sim_sensors;
pub mod tcp;
