use core::fmt;

use pacsat_core::{ByteBuffer, FileId, PduParseErr};

use crate::pb::crc16::{check_crc, crc16_ccitt};
use crate::pb::{PB_FILE_DEFAULT_BLOCK_SIZE, PB_FLAG_E};

/// File broadcast frame, sent to QST-1 with PID 0xBB
#[derive(Debug, Clone, PartialEq)]
pub struct FileBroadcast {
    pub flags: u8,
    pub file_id: FileId,
    pub file_type: u8,
    /// Byte offset of `data` within the file, 24 bits
    pub offset: u32,
    pub data: Vec<u8>,
}

impl FileBroadcast {
    pub const HEADER_LEN: usize = 9;

    pub fn is_last(&self) -> bool {
        self.flags & PB_FLAG_E != 0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        assert!(self.data.len() <= PB_FILE_DEFAULT_BLOCK_SIZE, "file broadcast data too long: {}", self.data.len());
        let mut buffer = ByteBuffer::new_autoexpand(Self::HEADER_LEN + self.data.len() + 2);
        buffer.write_u8(self.flags);
        buffer.write_u32(self.file_id);
        buffer.write_u8(self.file_type);
        buffer.write_u24(self.offset);
        buffer.write_bytes(&self.data);
        let mut bytes = buffer.into_bytes();
        let crc = crc16_ccitt(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PduParseErr> {
        if bytes.len() < Self::HEADER_LEN + 2 {
            return Err(PduParseErr::InconsistentLength { expected: Self::HEADER_LEN + 2, found: bytes.len() });
        }
        if !check_crc(bytes) {
            return Err(PduParseErr::Inconsistency { field: "crc", reason: "crc mismatch" });
        }
        let mut buffer = ByteBuffer::from_bytes(&bytes[..bytes.len() - 2]);
        Ok(FileBroadcast {
            flags: buffer.read_u8("flags")?,
            file_id: buffer.read_u32("file_id")?,
            file_type: buffer.read_u8("file_type")?,
            offset: buffer.read_u24("offset")?,
            data: buffer.read_remaining(),
        })
    }
}

impl fmt::Display for FileBroadcast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "FileBroadcast {{ file_id: {:04x} type: {} offset: {} len: {}{} }}",
            self.file_id,
            self.file_type,
            self.offset,
            self.data.len(),
            if self.is_last() { " E" } else { "" }
        )
    }
}
