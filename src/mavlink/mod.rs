//! # MAVLink Wire Protocol Module
//!
//! Minimal MAVLink v1 framing for the downlink.
//!
//! This module handles:
//! - X.25 CRC-16 checksum calculation
//! - Incremental frame parsing with resynchronization on corrupt input
//! - Batching parsed messages into UDP-sized flush buffers
//!
//! Messages are treated as opaque payloads; the only fields interpreted are
//! the message id (flush urgency, heartbeat detection) and the heartbeat
//! `base_mode` armed flag.

pub mod batch;
pub mod crc;
pub mod framer;
pub mod protocol;
