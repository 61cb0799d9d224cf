use core::fmt;

use pacsat_core::{ByteBuffer, PduParseErr, UnixTime, expect_value};

use crate::pb::{DIR_HOLE_LEN, MAX_DIR_HOLES};

/// Upload-time range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirHole {
    pub start: UnixTime,
    pub end: UnixTime,
}

impl DirHole {
    pub fn contains(&self, t: UnixTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Directory fill request, the information field of a UI frame with PID 0xBD
#[derive(Debug, Clone, PartialEq)]
pub struct DirRequest {
    pub flags: u8,
    pub block_size: u16,
    pub holes: Vec<DirHole>,
}

impl DirRequest {
    const HEADER_LEN: usize = 3;

    /// Parses and validates a fill request: flag bits 1..0 must be 00 and
    /// there must be 1 to 30 holes. Trailing bytes short of a full hole are ignored.
    pub fn from_bytes(info: &[u8]) -> Result<Self, PduParseErr> {
        let mut buffer = ByteBuffer::from_bytes(info);
        let flags = buffer.read_u8("flags")?;
        let block_size = buffer.read_u16("block_size")?;
        expect_value!(flags & 0b11, 0u8, "flags")?;

        let num_holes = info.len().saturating_sub(Self::HEADER_LEN) / DIR_HOLE_LEN;
        if num_holes < 1 || num_holes > MAX_DIR_HOLES {
            return Err(PduParseErr::InvalidValue { field: "num_holes", value: num_holes as u64 });
        }
        let mut holes = Vec::with_capacity(num_holes);
        for _ in 0..num_holes {
            let start = buffer.read_u32("hole_start")?;
            let end = buffer.read_u32("hole_end")?;
            holes.push(DirHole { start, end });
        }
        Ok(DirRequest { flags, block_size, holes })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(Self::HEADER_LEN + self.holes.len() * DIR_HOLE_LEN);
        buffer.write_u8(self.flags);
        buffer.write_u16(self.block_size);
        for hole in &self.holes {
            buffer.write_u32(hole.start);
            buffer.write_u32(hole.end);
        }
        buffer.into_bytes()
    }
}

impl fmt::Display for DirRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DirRequest {{ flags: {:02x} block_size: {} holes:", self.flags, self.block_size)?;
        for h in &self.holes {
            write!(f, " {}-{}", h.start, h.end)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use pacsat_core::debug;

    use super::*;

    #[test]
    fn test_parse_dir_request() {
        debug::setup_logging_verbose();
        let req = DirRequest { flags: 0x10, block_size: 244, holes: vec![DirHole { start: 100, end: 200 }] };
        let mut bytes = req.to_bytes();
        bytes.push(0xEE); // partial trailing hole
        let parsed = DirRequest::from_bytes(&bytes).unwrap();
        tracing::info!("Parsed: {}", parsed);
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_rejects_bad_requests() {
        let no_holes = DirRequest { flags: 0, block_size: 244, holes: vec![] };
        assert!(DirRequest::from_bytes(&no_holes.to_bytes()).is_err());

        let bad_flags = DirRequest { flags: 0x01, block_size: 244, holes: vec![DirHole { start: 0, end: 1 }] };
        assert!(DirRequest::from_bytes(&bad_flags.to_bytes()).is_err());

        let too_many = DirRequest { flags: 0, block_size: 244, holes: vec![DirHole { start: 0, end: 1 }; 31] };
        assert!(DirRequest::from_bytes(&too_many.to_bytes()).is_err());

        assert!(DirRequest::from_bytes(&[0x00, 0xF4]).is_err());
    }
}
