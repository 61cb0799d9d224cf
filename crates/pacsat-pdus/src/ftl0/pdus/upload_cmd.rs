use core::fmt;

use pacsat_core::{ByteBuffer, FileId, PduParseErr, let_field};

use crate::ftl0::enums::ftl0_packet_type::Ftl0PacketType;
use crate::ftl0::ftl0_header::{Ftl0Header, read_fixed_header};

/// UPLOAD_CMD, sent by the client to start a new upload (file id 0) or continue one
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCmd {
    /// 0 for a new file, otherwise the file id handed out by an earlier UL_GO_RESP
    pub continue_file_id: FileId,
    /// Declared total file length, header included
    pub file_length: u32,
}

impl UploadCmd {
    pub const PAYLOAD_LEN: usize = 8;

    /// Parses a complete packet. A payload length other than 8 is an error.
    pub fn from_buf(buffer: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        read_fixed_header(buffer, Ftl0PacketType::UploadCmd, Self::PAYLOAD_LEN)?;
        let_field!(buffer, continue_file_id, 4);
        let_field!(buffer, file_length, 4);
        Ok(UploadCmd { continue_file_id: continue_file_id as u32, file_length: file_length as u32 })
    }

    pub fn to_buf(&self, buffer: &mut ByteBuffer) {
        Ftl0Header::new(Ftl0PacketType::UploadCmd, Self::PAYLOAD_LEN).to_buf(buffer);
        buffer.write_u32(self.continue_file_id);
        buffer.write_u32(self.file_length);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(10);
        self.to_buf(&mut buffer);
        buffer.into_bytes()
    }
}

impl fmt::Display for UploadCmd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UploadCmd {{ continue_file_id: {:x} file_length: {} }}", self.continue_file_id, self.file_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_cmd() {
        let pdu = UploadCmd { continue_file_id: 0, file_length: 44 };
        let bytes = pdu.to_bytes();
        assert_eq!(bytes, vec![0x08, 0x03, 0, 0, 0, 0, 44, 0, 0, 0]);
        assert_eq!(UploadCmd::from_buf(&mut ByteBuffer::from_vec(bytes)).unwrap(), pdu);
    }

    #[test]
    fn test_upload_cmd_bad_length() {
        let bytes = Ftl0Header::encode_packet(Ftl0PacketType::UploadCmd, &[0u8; 7]);
        assert_eq!(
            UploadCmd::from_buf(&mut ByteBuffer::from_vec(bytes)),
            Err(PduParseErr::InconsistentLength { expected: 8, found: 7 })
        );
    }
}
