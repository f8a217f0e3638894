//! # X.25 CRC-16 Implementation
//!
//! CRC-16/X.25 (MCRF4XX variant) checksum calculation for MAVLink framing.
//!
//! **Polynomial**: 0x1021 reflected (0x8408)
//! **Initial Value**: 0xFFFF, no final XOR

/// Reflected CRC-16-CCITT polynomial
const CRC16_POLY: u16 = 0x8408;

/// CRC initial value
pub const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 1) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Accumulate one byte into a running CRC16
#[inline]
pub fn crc16_accumulate(crc: u16, byte: u8) -> u16 {
    (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0xFF) as usize]
}

/// Calculate CRC-16/X.25 over a byte slice
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (for MAVLink: everything
///   between the start byte and the checksum)
///
/// # Returns
///
/// * `u16` - Calculated CRC16 checksum
pub fn crc16_x25(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc = crc16_accumulate(crc, byte);
    }

    crc
}

/// Calculate CRC-16/X.25 using the direct algorithm (slow, for verification)
///
/// Used primarily for testing the lookup table implementation.
#[allow(dead_code)]
fn crc16_x25_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 1) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        let data = [];
        assert_eq!(crc16_x25(&data), CRC16_INIT);
    }

    #[test]
    fn test_crc16_check_vector() {
        // Standard CRC-16/MCRF4XX check value
        let data = b"123456789";
        assert_eq!(crc16_x25(data), 0x6F91);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0x09, 0x00, 0x01, 0x01, 0x00],
            vec![0x00; 32],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16_x25(data),
                crc16_x25_slow(data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc16_changes_with_data() {
        let data1 = [0x09, 0x00, 0x01, 0x01, 0x00];
        let data2 = [0x09, 0x00, 0x01, 0x01, 0x01];

        assert_ne!(crc16_x25(&data1), crc16_x25(&data2));
    }

    #[test]
    fn test_crc16_accumulate_matches_slice() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut crc = CRC16_INIT;
        for &b in &data {
            crc = crc16_accumulate(crc, b);
        }
        assert_eq!(crc, crc16_x25(&data));
    }
}
