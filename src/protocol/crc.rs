//! CRC16-CCITT frame checksum.
//!
//! Polynomial 0x1021, initial register 0xFFFF, no reflection, no final XOR
//! (the CRC-16/IBM-3740 parameterization). The two trailer bytes at the end
//! of every frame hold this value little-endian.

use crc::{Crc, CRC_16_IBM_3740};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the checksum over a byte span.
pub fn checksum(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Verify a frame that carries its checksum in the last two bytes.
///
/// Returns `false` for inputs shorter than the trailer itself.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 2 {
        return false;
    }

    let (body, trailer) = frame.split_at(frame.len() - 2);
    let expected = u16::from_le_bytes([trailer[0], trailer[1]]);

    checksum(body) == expected
}

/// Append the checksum trailer to a frame body in place.
pub fn append(frame: &mut Vec<u8>) {
    let crc = checksum(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Standard CRC-16/CCITT-FALSE check value.
        assert_eq!(checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_verify_round_trip() {
        let mut frame = vec![0xAA, 0x55, 0x02, 0xFF, 0x01];
        append(&mut frame);

        assert_eq!(frame.len(), 7);
        assert!(verify(&frame));
    }

    #[test]
    fn test_verify_rejects_short_input() {
        assert!(!verify(&[]));
        assert!(!verify(&[0x29]));
    }

    #[test]
    fn test_verify_rejects_corruption() {
        let mut frame = b"segment telemetry".to_vec();
        append(&mut frame);
        assert!(verify(&frame));

        for i in 0..frame.len() {
            let mut corrupted = frame.clone();
            corrupted[i] ^= 0x01;
            assert!(!verify(&corrupted), "single-bit flip at {i} went undetected");
        }
    }
}
