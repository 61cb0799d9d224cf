use core::fmt;

use pacsat_core::{ByteBuffer, FileId, PduParseErr, UnixTime};

use crate::pb::crc16::{check_crc, crc16_ccitt};
use crate::pb::{MAX_DIR_PFH_LENGTH, PB_FLAG_E, PB_FLAG_N};

/// Directory broadcast frame, sent to QST-1 with PID 0xBD.
///
/// There are no files other than `file_id` with t_old <= upload time <= t_new.
#[derive(Debug, Clone, PartialEq)]
pub struct DirBroadcast {
    pub flags: u8,
    pub file_id: FileId,
    /// Offset of `data` within the PFH
    pub offset: u32,
    pub t_old: UnixTime,
    pub t_new: UnixTime,
    /// Slice of the PFH, at most 182 bytes
    pub data: Vec<u8>,
}

impl DirBroadcast {
    pub const HEADER_LEN: usize = 17;

    pub fn is_last(&self) -> bool {
        self.flags & PB_FLAG_E != 0
    }

    pub fn is_newest(&self) -> bool {
        self.flags & PB_FLAG_N != 0
    }

    /// Serializes the frame and appends the CRC, big-endian
    pub fn to_bytes(&self) -> Vec<u8> {
        assert!(self.data.len() <= MAX_DIR_PFH_LENGTH, "dir broadcast data too long: {}", self.data.len());
        let mut buffer = ByteBuffer::new_autoexpand(Self::HEADER_LEN + self.data.len() + 2);
        buffer.write_u8(self.flags);
        buffer.write_u32(self.file_id);
        buffer.write_u32(self.offset);
        buffer.write_u32(self.t_old);
        buffer.write_u32(self.t_new);
        buffer.write_bytes(&self.data);
        let mut bytes = buffer.into_bytes();
        let crc = crc16_ccitt(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        bytes
    }

    /// Parses a frame as a ground station would, checking the CRC
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PduParseErr> {
        if bytes.len() < Self::HEADER_LEN + 2 {
            return Err(PduParseErr::InconsistentLength { expected: Self::HEADER_LEN + 2, found: bytes.len() });
        }
        if !check_crc(bytes) {
            return Err(PduParseErr::Inconsistency { field: "crc", reason: "crc mismatch" });
        }
        let mut buffer = ByteBuffer::from_bytes(&bytes[..bytes.len() - 2]);
        Ok(DirBroadcast {
            flags: buffer.read_u8("flags")?,
            file_id: buffer.read_u32("file_id")?,
            offset: buffer.read_u32("offset")?,
            t_old: buffer.read_u32("t_old")?,
            t_new: buffer.read_u32("t_new")?,
            data: buffer.read_remaining(),
        })
    }
}

impl fmt::Display for DirBroadcast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DirBroadcast {{ file_id: {:04x} offset: {} t_old: {} t_new: {} len: {}{}{} }}",
            self.file_id,
            self.offset,
            self.t_old,
            self.t_new,
            self.data.len(),
            if self.is_last() { " E" } else { "" },
            if self.is_newest() { " N" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_broadcast_layout() {
        let bc = DirBroadcast {
            flags: PB_FLAG_E | PB_FLAG_N,
            file_id: 0x0102_0304,
            offset: 0,
            t_old: 101,
            t_new: 150,
            data: vec![0xAA, 0x55, 0x00],
        };
        let bytes = bc.to_bytes();
        assert_eq!(bytes.len(), 17 + 3 + 2);
        assert_eq!(bytes[0], 0x60);
        assert_eq!(&bytes[1..5], &[0x04, 0x03, 0x02, 0x01]);
        let crc = crc16_ccitt(&bytes[..20]);
        assert_eq!(bytes[20], (crc >> 8) as u8);
        assert_eq!(bytes[21], crc as u8);

        let parsed = DirBroadcast::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, bc);

        let mut bad = bytes.clone();
        bad[18] ^= 1;
        assert!(DirBroadcast::from_bytes(&bad).is_err());
    }
}
