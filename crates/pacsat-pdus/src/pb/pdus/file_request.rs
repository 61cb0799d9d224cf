use core::fmt;

use pacsat_core::{ByteBuffer, FileId, PduParseErr};

use crate::pb::FILE_HOLE_LEN;
use crate::pb::enums::pb_file_req_mode::PbFileReqMode;

/// Byte range of a file, offset is 24 bits on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHole {
    pub offset: u32,
    pub length: u16,
}

/// File request, the information field of a UI frame with PID 0xBB.
///
/// The hole list is decoded whatever the mode; validating its size is left to the
/// broadcast queue, which first has to check that the file exists.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRequest {
    pub flags: u8,
    pub file_id: FileId,
    pub block_size: u16,
    pub holes: Vec<FileHole>,
}

impl FileRequest {
    const HEADER_LEN: usize = 7;

    pub fn from_bytes(info: &[u8]) -> Result<Self, PduParseErr> {
        let mut buffer = ByteBuffer::from_bytes(info);
        let flags = buffer.read_u8("flags")?;
        let file_id = buffer.read_u32("file_id")?;
        let block_size = buffer.read_u16("block_size")?;

        let num_holes = info.len().saturating_sub(Self::HEADER_LEN) / FILE_HOLE_LEN;
        let mut holes = Vec::with_capacity(num_holes);
        for _ in 0..num_holes {
            let offset = buffer.read_u24("hole_offset")?;
            let length = buffer.read_u16("hole_length")?;
            holes.push(FileHole { offset, length });
        }
        Ok(FileRequest { flags, file_id, block_size, holes })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(Self::HEADER_LEN + self.holes.len() * FILE_HOLE_LEN);
        buffer.write_u8(self.flags);
        buffer.write_u32(self.file_id);
        buffer.write_u16(self.block_size);
        for hole in &self.holes {
            buffer.write_u24(hole.offset);
            buffer.write_u16(hole.length);
        }
        buffer.into_bytes()
    }

    /// Request mode from flag bits 1..0. None for the invalid value 11.
    pub fn mode(&self) -> Option<PbFileReqMode> {
        PbFileReqMode::try_from((self.flags & 0b11) as u64).ok()
    }
}

impl fmt::Display for FileRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FileRequest {{ flags: {:02x} file_id: {:04x} block_size: {} holes:", self.flags, self.file_id, self.block_size)?;
        for h in &self.holes {
            write!(f, " {}+{}", h.offset, h.length)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_request() {
        let req = FileRequest {
            flags: PbFileReqMode::HoleList.into_raw() as u8,
            file_id: 0x0347,
            block_size: 244,
            holes: vec![FileHole { offset: 0x012345, length: 100 }, FileHole { offset: 0, length: 0xFFFF }],
        };
        let bytes = req.to_bytes();
        assert_eq!(bytes.len(), 7 + 10);
        assert_eq!(&bytes[7..10], &[0x45, 0x23, 0x01]);
        let parsed = FileRequest::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, req);
        assert_eq!(parsed.mode(), Some(PbFileReqMode::HoleList));
    }

    #[test]
    fn test_modes() {
        let mut req = FileRequest { flags: 0, file_id: 1, block_size: 0, holes: vec![] };
        assert_eq!(FileRequest::from_bytes(&req.to_bytes()).unwrap().mode(), Some(PbFileReqMode::StartSending));
        req.flags = 0b11;
        assert_eq!(req.mode(), None);
        assert!(FileRequest::from_bytes(&[0, 1, 0, 0]).is_err());
    }
}
