//! # MAVLink Protocol Constants and Types
//!
//! MAVLink v1 frame layout definitions and the opaque parsed message type.
//!
//! Frame structure: `stx(1) + len(1) + seq(1) + sysid(1) + compid(1) +
//! msgid(1) + payload(len) + ck_lo(1) + ck_hi(1)`. The checksum is
//! CRC-16/X.25 over everything between the start byte and the checksum,
//! extended with the per-message CRC_EXTRA seed byte.

use bytes::Bytes;

use super::crc::{crc16_accumulate, crc16_x25};

/// MAVLink v1 frame start byte
pub const MAVLINK_STX: u8 = 0xFE;

/// Frame header size (stx + len + seq + sysid + compid + msgid)
pub const MAVLINK_HEADER_LEN: usize = 6;

/// Checksum size (two bytes, little-endian)
pub const MAVLINK_CHECKSUM_LEN: usize = 2;

/// Total framing overhead per message
pub const MAVLINK_FRAME_OVERHEAD: usize = MAVLINK_HEADER_LEN + MAVLINK_CHECKSUM_LEN;

/// Maximum payload length (the length field is a single byte)
pub const MAVLINK_MAX_PAYLOAD_LEN: usize = 255;

/// HEARTBEAT message id (carries the armed flag in `base_mode`)
pub const MSG_ID_HEARTBEAT: u8 = 0;

/// ATTITUDE message id (the 10Hz HUD-rate message that triggers a flush)
pub const MSG_ID_ATTITUDE: u8 = 30;

/// MAV_MODE_FLAG_SAFETY_ARMED bit in the heartbeat `base_mode` field
pub const MAV_MODE_FLAG_SAFETY_ARMED: u8 = 0x80;

/// Offset of `base_mode` within the HEARTBEAT payload
const HEARTBEAT_BASE_MODE_OFFSET: usize = 6;

/// Minimum HEARTBEAT payload length
const HEARTBEAT_PAYLOAD_LEN: usize = 9;

/// Per-message CRC_EXTRA seed bytes for the common dialect
///
/// MAVLink folds a per-message-definition byte into the checksum so that a
/// sender and receiver with mismatched message definitions fail CRC instead
/// of misinterpreting payloads. Messages not listed here cannot be verified
/// and are discarded by the framer.
pub fn crc_extra(msg_id: u8) -> Option<u8> {
    let extra = match msg_id {
        0 => 50,    // HEARTBEAT
        1 => 124,   // SYS_STATUS
        2 => 137,   // SYSTEM_TIME
        4 => 237,   // PING
        20 => 214,  // PARAM_REQUEST_READ
        21 => 159,  // PARAM_REQUEST_LIST
        22 => 220,  // PARAM_VALUE
        23 => 168,  // PARAM_SET
        24 => 24,   // GPS_RAW_INT
        25 => 23,   // GPS_STATUS
        26 => 170,  // SCALED_IMU
        27 => 144,  // RAW_IMU
        29 => 115,  // SCALED_PRESSURE
        30 => 39,   // ATTITUDE
        31 => 246,  // ATTITUDE_QUATERNION
        32 => 185,  // LOCAL_POSITION_NED
        33 => 104,  // GLOBAL_POSITION_INT
        35 => 244,  // RC_CHANNELS_RAW
        36 => 222,  // SERVO_OUTPUT_RAW
        39 => 254,  // MISSION_ITEM
        40 => 230,  // MISSION_REQUEST
        42 => 28,   // MISSION_CURRENT
        43 => 132,  // MISSION_REQUEST_LIST
        44 => 221,  // MISSION_COUNT
        47 => 153,  // MISSION_ACK
        62 => 183,  // NAV_CONTROLLER_OUTPUT
        65 => 118,  // RC_CHANNELS
        66 => 148,  // REQUEST_DATA_STREAM
        69 => 243,  // MANUAL_CONTROL
        74 => 20,   // VFR_HUD
        76 => 152,  // COMMAND_LONG
        77 => 143,  // COMMAND_ACK
        109 => 185, // RADIO_STATUS
        147 => 154, // BATTERY_STATUS
        241 => 90,  // VIBRATION
        242 => 104, // HOME_POSITION
        253 => 83,  // STATUSTEXT
        _ => return None,
    };
    Some(extra)
}

/// One parsed telemetry message
///
/// Holds the complete wire frame so that re-serialization for a flush is a
/// byte-exact copy of what the flight controller sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryMessage {
    /// Message id from the frame header
    pub id: u8,
    /// Complete wire frame including header and checksum
    raw: Bytes,
}

impl TelemetryMessage {
    /// Wrap a validated wire frame
    ///
    /// The framer guarantees `raw` is a complete, checksum-verified frame.
    pub(crate) fn from_raw(raw: Bytes) -> Self {
        let id = raw[MAVLINK_HEADER_LEN - 1];
        Self { id, raw }
    }

    /// Message payload (between header and checksum)
    pub fn payload(&self) -> &[u8] {
        &self.raw[MAVLINK_HEADER_LEN..self.raw.len() - MAVLINK_CHECKSUM_LEN]
    }

    /// Payload length in bytes
    ///
    /// This is the length the batching FIFO accounts against its flush
    /// threshold, matching the wire `len` field.
    pub fn payload_len(&self) -> usize {
        self.raw.len() - MAVLINK_FRAME_OVERHEAD
    }

    /// Complete wire frame bytes
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Extract the armed flag if this is a heartbeat
    ///
    /// Returns `None` for any other message type, `Some(armed)` for a
    /// HEARTBEAT with the `MAV_MODE_FLAG_SAFETY_ARMED` bit decoded from
    /// `base_mode`.
    pub fn heartbeat_armed(&self) -> Option<bool> {
        if self.id != MSG_ID_HEARTBEAT || self.payload_len() < HEARTBEAT_PAYLOAD_LEN {
            return None;
        }
        let base_mode = self.payload()[HEARTBEAT_BASE_MODE_OFFSET];
        Some(base_mode & MAV_MODE_FLAG_SAFETY_ARMED != 0)
    }
}

/// Encode a MAVLink v1 frame
///
/// # Arguments
///
/// * `seq` - Sequence counter byte
/// * `sys_id` - Source system id
/// * `comp_id` - Source component id
/// * `msg_id` - Message id (must be in the CRC_EXTRA table)
/// * `payload` - Message payload, at most [`MAVLINK_MAX_PAYLOAD_LEN`] bytes
///
/// # Returns
///
/// * `Option<Vec<u8>>` - Complete wire frame, or `None` for an unknown
///   message id or oversized payload
pub fn encode_frame(seq: u8, sys_id: u8, comp_id: u8, msg_id: u8, payload: &[u8]) -> Option<Vec<u8>> {
    if payload.len() > MAVLINK_MAX_PAYLOAD_LEN {
        return None;
    }
    let extra = crc_extra(msg_id)?;

    let mut frame = Vec::with_capacity(payload.len() + MAVLINK_FRAME_OVERHEAD);
    frame.push(MAVLINK_STX);
    frame.push(payload.len() as u8);
    frame.push(seq);
    frame.push(sys_id);
    frame.push(comp_id);
    frame.push(msg_id);
    frame.extend_from_slice(payload);

    let crc = crc16_accumulate(crc16_x25(&frame[1..]), extra);
    frame.extend_from_slice(&crc.to_le_bytes());
    Some(frame)
}

/// Encode a HEARTBEAT frame (test and ground-tool helper)
pub fn encode_heartbeat(seq: u8, armed: bool) -> Vec<u8> {
    let base_mode = if armed { MAV_MODE_FLAG_SAFETY_ARMED } else { 0 };
    // custom_mode(4) + type + autopilot + base_mode + system_status + mavlink_version
    let payload = [0, 0, 0, 0, 2, 3, base_mode, 4, 3];
    encode_frame(seq, 1, 1, MSG_ID_HEARTBEAT, &payload)
        .expect("heartbeat is always encodable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_overhead() {
        assert_eq!(MAVLINK_FRAME_OVERHEAD, 8);
    }

    #[test]
    fn test_crc_extra_known_messages() {
        assert_eq!(crc_extra(MSG_ID_HEARTBEAT), Some(50));
        assert_eq!(crc_extra(MSG_ID_ATTITUDE), Some(39));
        assert_eq!(crc_extra(74), Some(20));
    }

    #[test]
    fn test_crc_extra_unknown_message() {
        assert_eq!(crc_extra(200), None);
    }

    #[test]
    fn test_encode_frame_structure() {
        let payload = [1u8, 2, 3, 4];
        let frame = encode_frame(7, 1, 1, MSG_ID_ATTITUDE, &payload).unwrap();

        assert_eq!(frame.len(), payload.len() + MAVLINK_FRAME_OVERHEAD);
        assert_eq!(frame[0], MAVLINK_STX);
        assert_eq!(frame[1], payload.len() as u8);
        assert_eq!(frame[2], 7); // seq
        assert_eq!(frame[5], MSG_ID_ATTITUDE);
        assert_eq!(&frame[6..10], &payload);
    }

    #[test]
    fn test_encode_frame_unknown_id() {
        assert!(encode_frame(0, 1, 1, 200, &[0]).is_none());
    }

    #[test]
    fn test_heartbeat_armed_flag() {
        let armed = TelemetryMessage::from_raw(encode_heartbeat(0, true).into());
        assert_eq!(armed.heartbeat_armed(), Some(true));

        let disarmed = TelemetryMessage::from_raw(encode_heartbeat(1, false).into());
        assert_eq!(disarmed.heartbeat_armed(), Some(false));
    }

    #[test]
    fn test_heartbeat_armed_on_other_message() {
        let frame = encode_frame(0, 1, 1, MSG_ID_ATTITUDE, &[0u8; 28]).unwrap();
        let msg = TelemetryMessage::from_raw(frame.into());
        assert_eq!(msg.heartbeat_armed(), None);
    }

    #[test]
    fn test_payload_accessors() {
        let payload: Vec<u8> = (0..28).collect();
        let frame = encode_frame(3, 1, 1, MSG_ID_ATTITUDE, &payload).unwrap();
        let msg = TelemetryMessage::from_raw(frame.clone().into());

        assert_eq!(msg.id, MSG_ID_ATTITUDE);
        assert_eq!(msg.payload(), &payload[..]);
        assert_eq!(msg.payload_len(), 28);
        assert_eq!(msg.raw_bytes(), &frame[..]);
    }
}
