//! # Video Packetizer
//!
//! Consumes arbitrary-length chunks of the H.264 elementary stream,
//! re-delimits it into access units on Annex-B start codes, and slices each
//! completed unit into UDP-sized packets tagged for reassembly.
//!
//! Chunk boundaries carry no meaning: the camera pipeline hands over
//! whatever the pipe had, and the packetizer's output depends only on the
//! stream content. Each emitted unit retains its leading start code, so the
//! ground station can concatenate payloads (ordered by package id) straight
//! into a decodable stream.
//!
//! Completed packets go through the bounded [`VideoTxFifo`]; ingestion
//! never blocks, the FIFO evicts stale packets under pressure.

use bytes::BytesMut;
use tracing::debug;

use super::tx_fifo::{VideoPacket, VideoTxFifo};

/// Annex-B access unit delimiter
const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Elementary-stream packetizer with bounded transmit queue
#[derive(Debug)]
pub struct VideoPacketizer {
    /// Reused collection buffer for the unit under assembly, allocated once
    unit_buf: BytesMut,
    /// Resume offset into `unit_buf` for the start-code scan
    scan_pos: usize,
    max_payload: usize,
    max_unit_bytes: usize,
    frame_id: u16,
    fifo: VideoTxFifo,
}

impl VideoPacketizer {
    /// Create a packetizer
    ///
    /// # Arguments
    ///
    /// * `max_payload` - Largest packet payload; the datagram adds a 4-byte
    ///   reassembly header on top
    /// * `fifo_capacity_bytes` - Transmit queue bound in datagram bytes
    /// * `max_unit_bytes` - Collection buffer size; an access unit growing
    ///   past this is shipped in parts rather than growing the buffer
    pub fn new(max_payload: usize, fifo_capacity_bytes: usize, max_unit_bytes: usize) -> Self {
        Self {
            unit_buf: BytesMut::with_capacity(max_unit_bytes + START_CODE.len()),
            scan_pos: 0,
            max_payload,
            max_unit_bytes,
            frame_id: 0,
            fifo: VideoTxFifo::new(fifo_capacity_bytes),
        }
    }

    /// Ingest one chunk of the elementary stream
    ///
    /// Every access unit completed by this chunk is sliced into packets and
    /// queued. Never blocks; under queue pressure the oldest packets are
    /// evicted and counted as dropped.
    pub fn input_stream(&mut self, chunk: &[u8]) {
        self.unit_buf.extend_from_slice(chunk);

        loop {
            match find_start_code(&self.unit_buf[self.scan_pos..]) {
                Some(off) => {
                    let at = self.scan_pos + off;
                    if at > 0 {
                        // Everything before this delimiter is one complete unit
                        let unit = self.unit_buf.split_to(at);
                        self.packetize_unit(&unit);
                    }
                    // Buffer now begins with the next unit's start code
                    self.scan_pos = START_CODE.len();
                }
                None => {
                    // Keep the tail unscanned in case a start code straddles
                    // this chunk and the next
                    self.scan_pos = self.unit_buf.len().saturating_sub(START_CODE.len() - 1);
                    break;
                }
            }
        }

        if self.unit_buf.len() > self.max_unit_bytes {
            // Oversized access unit: ship what is collected instead of
            // growing the buffer
            debug!(
                "Access unit exceeds {} bytes, splitting frame {}",
                self.max_unit_bytes, self.frame_id
            );
            let len = self.unit_buf.len();
            let unit = self.unit_buf.split_to(len);
            self.packetize_unit(&unit);
            self.scan_pos = 0;
        }
    }

    /// Slice one completed unit into tagged packets and queue them
    fn packetize_unit(&mut self, unit: &[u8]) {
        let mut package_id: u16 = 0;
        for piece in unit.chunks(self.max_payload) {
            self.fifo
                .push(VideoPacket::new(self.frame_id, package_id, piece));
            package_id = package_id.wrapping_add(1);
        }
        self.frame_id = self.frame_id.wrapping_add(1);
    }

    /// Head packet ready for transmit, without removing it
    ///
    /// Returns the same packet until [`VideoPacketizer::next_tx_package`]
    /// commits it; a failed UDP send simply retries the head next iteration.
    pub fn get_tx_package(&self) -> Option<&VideoPacket> {
        self.fifo.peek()
    }

    /// Commit the head packet after a successful transmit
    pub fn next_tx_package(&mut self) {
        self.fifo.advance();
    }

    /// Number of packets waiting in the transmit queue
    pub fn tx_queue_len(&self) -> usize {
        self.fifo.len()
    }

    /// Bytes evicted from the transmit queue since the last counter reset
    pub fn bytes_dropped(&self) -> u64 {
        self.fifo.bytes_dropped()
    }

    /// Bytes committed as transmitted since the last counter reset
    pub fn bytes_outputted(&self) -> u64 {
        self.fifo.bytes_outputted()
    }

    /// Reset the I/O counters after a status report
    pub fn clear_io_status(&mut self) {
        self.fifo.clear_io_status();
    }
}

/// Locate the next Annex-B start code in `hay`
fn find_start_code(hay: &[u8]) -> Option<usize> {
    hay.windows(START_CODE.len())
        .position(|w| w == START_CODE)
}
