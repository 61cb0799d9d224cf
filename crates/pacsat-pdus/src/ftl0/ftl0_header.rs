use pacsat_core::{ByteBuffer, PduParseErr, expect_pdu_type};

use crate::ftl0::enums::ftl0_packet_type::Ftl0PacketType;

pub const FTL0_HEADER_LEN: usize = 2;
/// Length is an 11-bit field
pub const FTL0_MAX_PAYLOAD_LEN: usize = 0x7FF;

/// The two-byte header in front of every FTL0 packet:
/// byte 0 = length low byte, byte 1 = `(type & 0x1F) | ((length >> 8) & 0x07) << 5`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ftl0Header {
    /// Declared payload length in bytes
    pub length: u16,
    /// Raw 5-bit packet type. Unknown values are kept so the caller can react to them.
    pub packet_type: u8,
}

impl Ftl0Header {
    pub fn new(packet_type: Ftl0PacketType, length: usize) -> Self {
        assert!(length <= FTL0_MAX_PAYLOAD_LEN, "ftl0 payload too long: {}", length);
        Self { length: length as u16, packet_type: packet_type.into_raw() as u8 }
    }

    pub fn from_buf(buffer: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let b0 = buffer.read_u8("length_lsb")?;
        let b1 = buffer.read_u8("type_length_msb")?;
        Ok(Ftl0Header {
            length: b0 as u16 | (((b1 >> 5) as u16) << 8),
            packet_type: b1 & 0x1F,
        })
    }

    pub fn to_buf(&self, buffer: &mut ByteBuffer) {
        buffer.write_u8((self.length & 0xFF) as u8);
        buffer.write_u8((self.packet_type & 0x1F) | ((((self.length >> 8) & 0x07) as u8) << 5));
    }

    /// Decoded packet type, if known
    pub fn get_type(&self) -> Option<Ftl0PacketType> {
        Ftl0PacketType::try_from(self.packet_type as u64).ok()
    }

    /// Builds a complete packet: header followed by `payload`
    pub fn encode_packet(packet_type: Ftl0PacketType, payload: &[u8]) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(FTL0_HEADER_LEN + payload.len());
        Self::new(packet_type, payload.len()).to_buf(&mut buffer);
        buffer.write_bytes(payload);
        buffer.into_bytes()
    }
}

/// Reads a header, checks its type, and checks that the declared length is exactly `expected_len`
pub(crate) fn read_fixed_header(
    buffer: &mut ByteBuffer,
    expected: Ftl0PacketType,
    expected_len: usize,
) -> Result<Ftl0Header, PduParseErr> {
    let header = Ftl0Header::from_buf(buffer)?;
    expect_pdu_type!(header.packet_type as u64, expected)?;
    if header.length as usize != expected_len {
        return Err(PduParseErr::InconsistentLength { expected: expected_len, found: header.length as usize });
    }
    Ok(header)
}
