//! # Video Transmit FIFO
//!
//! Bounded-by-bytes queue of ready-to-send video packets.
//!
//! Unlike the telemetry batch (which rejects new messages when full), this
//! queue evicts its oldest packets to admit new ones: video favors
//! freshness, stale frames are worthless to the ground station. Evicted
//! bytes accumulate into the drop counter for the status report.
//!
//! The head of the queue is consumed with an explicit peek-then-advance
//! contract: a failed or partial UDP send must not lose the packet, so it
//! stays at the head until the caller commits it.

use std::collections::VecDeque;

use bytes::Bytes;

/// One UDP-sized fragment of a video frame
///
/// `data` is the complete datagram: a 4-byte header (`frame_id: u16 LE`,
/// `package_id: u16 LE`) followed by the payload slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPacket {
    /// Frame (access unit) number, wrapping at 16 bits
    pub frame_id: u16,
    /// Fragment number within the frame, starting at 0
    pub package_id: u16,
    data: Bytes,
}

/// Header size prepended to every packet payload
pub const PACKET_HEADER_LEN: usize = 4;

impl VideoPacket {
    /// Build a packet from its tags and payload slice
    pub fn new(frame_id: u16, package_id: u16, payload: &[u8]) -> Self {
        let mut data = Vec::with_capacity(PACKET_HEADER_LEN + payload.len());
        data.extend_from_slice(&frame_id.to_le_bytes());
        data.extend_from_slice(&package_id.to_le_bytes());
        data.extend_from_slice(payload);
        Self {
            frame_id,
            package_id,
            data: data.into(),
        }
    }

    /// Complete datagram bytes (header + payload)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload bytes without the reassembly header
    pub fn payload(&self) -> &[u8] {
        &self.data[PACKET_HEADER_LEN..]
    }

    /// Datagram size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the datagram is empty (never true for packetizer output)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Byte-capacity bounded transmit queue with evict-oldest policy
#[derive(Debug)]
pub struct VideoTxFifo {
    queue: VecDeque<VideoPacket>,
    capacity_bytes: usize,
    queued_bytes: usize,
    bytes_dropped: u64,
    bytes_outputted: u64,
}

impl VideoTxFifo {
    /// Create a FIFO bounded to `capacity_bytes` of queued datagrams
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity_bytes,
            queued_bytes: 0,
            bytes_dropped: 0,
            bytes_outputted: 0,
        }
    }

    /// Append a packet, evicting oldest packets if needed
    ///
    /// Never fails and never blocks: when the packet does not fit, the
    /// oldest unsent packets are discarded until it does, and the evicted
    /// bytes are added to the drop counter.
    pub fn push(&mut self, packet: VideoPacket) {
        while self.queued_bytes + packet.len() > self.capacity_bytes {
            match self.queue.pop_front() {
                Some(stale) => {
                    self.queued_bytes -= stale.len();
                    self.bytes_dropped += stale.len() as u64;
                }
                None => break, // packet alone exceeds capacity; queue it anyway
            }
        }
        self.queued_bytes += packet.len();
        self.queue.push_back(packet);
    }

    /// Head packet without removing it
    pub fn peek(&self) -> Option<&VideoPacket> {
        self.queue.front()
    }

    /// Commit the head packet after a successful transmit
    ///
    /// Counts the packet's bytes as outputted. Calling this without a
    /// preceding successful send loses the packet, so callers only advance
    /// after the full datagram went out.
    pub fn advance(&mut self) {
        if let Some(sent) = self.queue.pop_front() {
            self.queued_bytes -= sent.len();
            self.bytes_outputted += sent.len() as u64;
        }
    }

    /// Number of queued packets
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Currently queued bytes
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Cumulative bytes evicted since the last counter reset
    pub fn bytes_dropped(&self) -> u64 {
        self.bytes_dropped
    }

    /// Cumulative bytes committed as sent since the last counter reset
    pub fn bytes_outputted(&self) -> u64 {
        self.bytes_outputted
    }

    /// Reset the drop/output counters (after a status report)
    pub fn clear_io_status(&mut self) {
        self.bytes_dropped = 0;
        self.bytes_outputted = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(frame_id: u16, package_id: u16, payload_len: usize) -> VideoPacket {
        VideoPacket::new(frame_id, package_id, &vec![0xAB; payload_len])
    }

    #[test]
    fn test_packet_layout() {
        let p = VideoPacket::new(0x0201, 0x0403, &[9, 9]);
        assert_eq!(p.data(), &[0x01, 0x02, 0x03, 0x04, 9, 9]);
        assert_eq!(p.payload(), &[9, 9]);
        assert_eq!(p.len(), 6);
    }

    #[test]
    fn test_fifo_order() {
        let mut fifo = VideoTxFifo::new(4096);
        for i in 0..4 {
            fifo.push(packet(1, i, 100));
        }

        for i in 0..4 {
            assert_eq!(fifo.peek().unwrap().package_id, i);
            fifo.advance();
        }
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut fifo = VideoTxFifo::new(4096);
        fifo.push(packet(7, 0, 50));

        let first = fifo.peek().unwrap().clone();
        let second = fifo.peek().unwrap().clone();
        assert_eq!(first, second, "peek twice returns the identical packet");
        assert_eq!(fifo.len(), 1);
    }

    #[test]
    fn test_evict_oldest_exact_accounting() {
        // Capacity fits exactly two 104-byte datagrams (100 + 4 header)
        let mut fifo = VideoTxFifo::new(208);
        fifo.push(packet(1, 0, 100));
        fifo.push(packet(1, 1, 100));
        assert_eq!(fifo.queued_bytes(), 208);
        assert_eq!(fifo.bytes_dropped(), 0);

        // One more evicts exactly the oldest
        fifo.push(packet(2, 0, 100));
        assert_eq!(fifo.len(), 2);
        assert_eq!(fifo.bytes_dropped(), 104);
        assert_eq!(fifo.peek().unwrap().package_id, 1, "survivors keep order");
    }

    #[test]
    fn test_evict_multiple_to_admit_large() {
        let mut fifo = VideoTxFifo::new(340);
        fifo.push(packet(1, 0, 60)); // 64 bytes each
        fifo.push(packet(1, 1, 60));
        fifo.push(packet(1, 2, 60));
        fifo.push(packet(1, 3, 60));
        assert_eq!(fifo.queued_bytes(), 256);

        // A 204-byte datagram needs two evictions to fit under 340
        fifo.push(packet(2, 0, 200));
        assert_eq!(fifo.bytes_dropped(), 128);
        assert_eq!(fifo.len(), 3);
        let head = fifo.peek().unwrap();
        assert_eq!((head.frame_id, head.package_id), (1, 2));
    }

    #[test]
    fn test_outputted_counter_and_reset() {
        let mut fifo = VideoTxFifo::new(4096);
        fifo.push(packet(1, 0, 100));
        fifo.push(packet(1, 1, 100));

        fifo.advance();
        assert_eq!(fifo.bytes_outputted(), 104);

        fifo.clear_io_status();
        assert_eq!(fifo.bytes_outputted(), 0);
        assert_eq!(fifo.bytes_dropped(), 0);
        assert_eq!(fifo.len(), 1, "reset touches counters, not the queue");
    }
}
