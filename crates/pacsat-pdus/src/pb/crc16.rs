//! CRC-16/CCITT (polynomial 0x1021, initial value 0, MSB first) as appended to
//! broadcast frames. The CRC goes on the wire big-endian.

const POLY: u16 = 0x1021;

pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in data {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// True when `data` ends with a valid big-endian CRC over the bytes before it
pub fn check_crc(data: &[u8]) -> bool {
    data.len() >= 2 && crc16_ccitt(data) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        // CRC-16/XMODEM check value
        assert_eq!(crc16_ccitt(b"123456789"), 0x31C3);
        assert_eq!(crc16_ccitt(&[]), 0);
    }

    #[test]
    fn test_appended_crc_checks() {
        let mut frame = b"PACSAT".to_vec();
        let crc = crc16_ccitt(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());
        assert!(check_crc(&frame));
        frame[2] ^= 0x40;
        assert!(!check_crc(&frame));
    }
}
