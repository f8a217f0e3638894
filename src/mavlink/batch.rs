//! # Telemetry Batching FIFO
//!
//! Accumulates parsed telemetry messages until a flush is due, then drains
//! them into one UDP-sized datagram.
//!
//! Batching policy: a flush is due when the urgent message class arrives
//! (the 10Hz attitude/HUD message, so the ground sees fresh attitude with
//! bounded latency) or when the queued payload bytes exceed the threshold
//! that still fits a single datagram under typical MTU. A full FIFO rejects
//! new messages rather than evicting queued ones: a batch is never
//! corrupted by partial eviction, the caller just counts the drop.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use super::protocol::TelemetryMessage;

/// Bounded FIFO of parsed telemetry messages with byte accounting
#[derive(Debug)]
pub struct TelemetryBatch {
    queue: VecDeque<TelemetryMessage>,
    capacity: usize,
    /// Sum of payload lengths over queued messages
    total_bytes: usize,
    flush_bytes: usize,
    urgent_msg_id: u8,
}

impl TelemetryBatch {
    /// Create a batch FIFO
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of queued messages
    /// * `flush_bytes` - Queued payload bytes above which a flush is due
    /// * `urgent_msg_id` - Message id that forces an immediate flush
    pub fn new(capacity: usize, flush_bytes: usize, urgent_msg_id: u8) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            total_bytes: 0,
            flush_bytes,
            urgent_msg_id,
        }
    }

    /// Try to enqueue a message
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if the FIFO is full; the message is rejected and
    ///   the caller must account the drop
    pub fn try_push(&mut self, msg: TelemetryMessage) -> bool {
        if self.queue.len() >= self.capacity {
            return false;
        }
        self.total_bytes += msg.payload_len();
        self.queue.push_back(msg);
        true
    }

    /// Whether this message makes a flush due
    ///
    /// True for the urgent message class, or once the queued payload bytes
    /// exceed the flush threshold. Checked after the push attempt, so the
    /// candidate's own bytes count; an urgent message triggers the flush
    /// even if it was itself rejected.
    pub fn flush_due(&self, msg: &TelemetryMessage) -> bool {
        msg.id == self.urgent_msg_id || self.backlog_due()
    }

    /// Whether the queued payload bytes alone exceed the flush threshold
    ///
    /// Used after a flush completes: the batch may have refilled past the
    /// threshold while an earlier buffer waited out a stalled socket.
    pub fn backlog_due(&self) -> bool {
        self.total_bytes > self.flush_bytes
    }

    /// Drain the FIFO into one serialized buffer
    ///
    /// Re-serializes every queued message in arrival order (byte-exact wire
    /// frames) and resets the byte counter. The buffer lives for one flush
    /// cycle.
    pub fn drain(&mut self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_bytes());
        for msg in self.queue.drain(..) {
            buf.extend_from_slice(msg.raw_bytes());
        }
        self.total_bytes = 0;
        buf.freeze()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the FIFO is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued payload bytes (the flush-threshold accounting)
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Queued wire bytes (payloads plus framing overhead)
    fn wire_bytes(&self) -> usize {
        self.queue.iter().map(|m| m.raw_bytes().len()).sum()
    }
}
