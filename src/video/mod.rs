//! # Video Module
//!
//! Turns the raw H.264 elementary stream into UDP-sized packets.
//!
//! This module handles:
//! - Re-delimiting the stream into access units on Annex-B start codes
//! - Slicing units into tagged packets (frame id + package id header)
//! - The bounded transmit FIFO with evict-oldest drop accounting
//! - Optional on-disk recording with size-based file rotation

pub mod packetizer;
pub mod recorder;
pub mod tx_fifo;
