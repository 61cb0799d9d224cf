//! KISS framing between the server and a TNC

use pacsat_core::ChannelId;

pub const FEND: u8 = 0xC0;
pub const FESC: u8 = 0xDB;
pub const TFEND: u8 = 0xDC;
pub const TFESC: u8 = 0xDD;

/// Command nibble of a data frame
const CMD_DATA: u8 = 0x00;

/// Upper bound on a frame; anything longer is line noise
const MAX_FRAME_LEN: usize = 1024;

/// Wraps an AX.25 frame in a KISS data frame for the given port
pub fn encode(port: ChannelId, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    out.push(FEND);
    out.push((port & 0x0F) << 4 | CMD_DATA);
    for &b in data {
        match b {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            _ => out.push(b),
        }
    }
    out.push(FEND);
    out
}

/// Incremental decoder for a KISS byte stream
#[derive(Default)]
pub struct KissDecoder {
    buf: Vec<u8>,
    escape: bool,
    overflow: bool,
}

impl KissDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes from the TNC. Returns the data frames completed by them, with their port.
    /// Frames for other KISS commands are dropped.
    pub fn push(&mut self, data: &[u8]) -> Vec<(ChannelId, Vec<u8>)> {
        let mut frames = Vec::new();
        for &b in data {
            if b == FEND {
                if let Some(frame) = self.finish() {
                    frames.push(frame);
                }
                continue;
            }
            let b = if self.escape {
                self.escape = false;
                match b {
                    TFEND => FEND,
                    TFESC => FESC,
                    other => {
                        tracing::debug!("KissDecoder: bad escape {:02x}", other);
                        other
                    }
                }
            } else if b == FESC {
                self.escape = true;
                continue;
            } else {
                b
            };
            if self.buf.len() >= MAX_FRAME_LEN {
                self.overflow = true;
                continue;
            }
            self.buf.push(b);
        }
        frames
    }

    fn finish(&mut self) -> Option<(ChannelId, Vec<u8>)> {
        let frame = std::mem::take(&mut self.buf);
        let overflow = std::mem::replace(&mut self.overflow, false);
        self.escape = false;

        let (&type_byte, payload) = frame.split_first()?;
        if overflow {
            tracing::warn!("KissDecoder: dropping frame longer than {} bytes", MAX_FRAME_LEN);
            return None;
        }
        if type_byte & 0x0F != CMD_DATA {
            tracing::trace!("KissDecoder: ignoring command {:02x}", type_byte);
            return None;
        }
        if payload.is_empty() {
            return None;
        }
        Some((type_byte >> 4, payload.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        let encoded = encode(2, &[0x01, FEND, 0x02, FESC]);
        assert_eq!(encoded, vec![FEND, 0x20, 0x01, FESC, TFEND, 0x02, FESC, TFESC, FEND]);

        let mut decoder = KissDecoder::new();
        assert_eq!(decoder.push(&encoded), vec![(2, vec![0x01, FEND, 0x02, FESC])]);
    }

    #[test]
    fn test_split_and_back_to_back() {
        let mut stream = encode(0, b"abc");
        stream.extend(encode(1, b"de"));
        let mut decoder = KissDecoder::new();

        let (first, second) = stream.split_at(4);
        assert!(decoder.push(first).is_empty());
        assert_eq!(decoder.push(second), vec![(0, b"abc".to_vec()), (1, b"de".to_vec())]);
    }

    #[test]
    fn test_ignores_commands_and_noise() {
        let mut decoder = KissDecoder::new();
        // TXDELAY command, empty frame, then data
        let mut stream = vec![FEND, 0x01, 0x30, FEND, FEND, FEND];
        stream.extend(encode(3, b"x"));
        assert_eq!(decoder.push(&stream), vec![(3, b"x".to_vec())]);

        let mut long = vec![FEND, 0x00];
        long.extend(std::iter::repeat_n(0x55, MAX_FRAME_LEN + 10));
        long.push(FEND);
        assert!(decoder.push(&long).is_empty());
        assert_eq!(decoder.push(&encode(0, b"ok")), vec![(0, b"ok".to_vec())]);
    }
}
