//! # Link Status Counters
//!
//! Byte counters accumulated by the multiplexer between status reports.

/// Per-interval byte counters, reset after each periodic report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    /// Telemetry bytes flushed to the ground
    pub mavlink_tx: u64,
    /// Uplink telemetry bytes passed through to the flight controller
    pub mavlink_rx: u64,
    /// Telemetry payload bytes dropped on batch-FIFO reject
    pub mavlink_dropped: u64,
    /// Video datagram bytes transmitted (from the packetizer counters)
    pub video_tx: u64,
    /// Video datagram bytes evicted under queue pressure
    pub video_dropped: u64,
}

impl LinkStatus {
    /// Reset all counters for the next report interval
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_resets_all_counters() {
        let mut status = LinkStatus {
            mavlink_tx: 1,
            mavlink_rx: 2,
            mavlink_dropped: 3,
            video_tx: 4,
            video_dropped: 5,
        };
        status.clear();
        assert_eq!(status, LinkStatus::default());
    }
}
