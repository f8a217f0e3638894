//! # FPV Downlink Library
//!
//! Air-side endpoint of a drone video/telemetry downlink.
//!
//! This library multiplexes a raw H.264 elementary stream (piped in from a
//! camera pipeline) and MAVLink telemetry (read from the flight controller's
//! serial port) onto a lossy UDP link to a ground station, and forwards
//! uplink telemetry from the ground back to the flight controller.

pub mod config;
pub mod error;
pub mod link;
pub mod mavlink;
pub mod serial;
pub mod telemetry;
pub mod video;
