//! Application core — connection lifecycle and control surface.
//!
//! All interaction with sockets and observers happens through **port
//! traits** defined in [`ports`], keeping the lifecycle logic testable
//! without a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
