use core::fmt;

use pacsat_core::{ByteBuffer, FileId, PduParseErr, let_field};

use crate::ftl0::enums::ftl0_packet_type::Ftl0PacketType;
use crate::ftl0::ftl0_header::{Ftl0Header, read_fixed_header};

/// UL_GO_RESP: the server accepts an upload and tells the client where to resume
#[derive(Debug, Clone, PartialEq)]
pub struct UlGoResp {
    pub server_file_id: FileId,
    pub byte_offset: u32,
}

impl UlGoResp {
    const PAYLOAD_LEN: usize = 8;

    pub fn from_buf(buffer: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        read_fixed_header(buffer, Ftl0PacketType::UlGoResp, Self::PAYLOAD_LEN)?;
        let_field!(buffer, server_file_id, 4);
        let_field!(buffer, byte_offset, 4);
        Ok(UlGoResp { server_file_id: server_file_id as u32, byte_offset: byte_offset as u32 })
    }

    pub fn to_buf(&self, buffer: &mut ByteBuffer) {
        Ftl0Header::new(Ftl0PacketType::UlGoResp, Self::PAYLOAD_LEN).to_buf(buffer);
        buffer.write_u32(self.server_file_id);
        buffer.write_u32(self.byte_offset);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(10);
        self.to_buf(&mut buffer);
        buffer.into_bytes()
    }
}

impl fmt::Display for UlGoResp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UlGoResp {{ server_file_id: {:x} byte_offset: {} }}", self.server_file_id, self.byte_offset)
    }
}
