//! # Link Module
//!
//! The top-level single-task scheduler over all downlink I/O.
//!
//! This module handles:
//! - The non-blocking event loop over serial, uplink and video descriptors
//! - Arbitration between telemetry flushes and video transmission
//! - Byte counters for the periodic status report

pub mod mux;
pub mod status;

pub use mux::LinkMux;
pub use status::LinkStatus;
