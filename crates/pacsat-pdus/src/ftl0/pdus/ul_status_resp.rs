use core::fmt;

use pacsat_core::{ByteBuffer, PduParseErr};

use crate::ftl0::enums::ftl0_error::Ftl0Error;
use crate::ftl0::enums::ftl0_packet_type::Ftl0PacketType;
use crate::ftl0::ftl0_header::Ftl0Header;

/// UL_ERROR_RESP, UL_ACK_RESP or UL_NAK_RESP: a single error code byte
#[derive(Debug, Clone, PartialEq)]
pub struct UlStatusResp {
    pub packet_type: Ftl0PacketType,
    pub error: Ftl0Error,
}

impl UlStatusResp {
    const PAYLOAD_LEN: usize = 1;

    pub fn error(error: Ftl0Error) -> Self {
        Self { packet_type: Ftl0PacketType::UlErrorResp, error }
    }

    pub fn ack() -> Self {
        Self { packet_type: Ftl0PacketType::UlAckResp, error: Ftl0Error::None }
    }

    pub fn nak(error: Ftl0Error) -> Self {
        Self { packet_type: Ftl0PacketType::UlNakResp, error }
    }

    pub fn from_buf(buffer: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let header = Ftl0Header::from_buf(buffer)?;
        let packet_type = match header.get_type() {
            Some(t @ (Ftl0PacketType::UlErrorResp | Ftl0PacketType::UlAckResp | Ftl0PacketType::UlNakResp)) => t,
            _ => return Err(PduParseErr::InvalidValue { field: "packet_type", value: header.packet_type as u64 }),
        };
        if header.length as usize != Self::PAYLOAD_LEN {
            return Err(PduParseErr::InconsistentLength { expected: Self::PAYLOAD_LEN, found: header.length as usize });
        }
        let raw = buffer.read_u8("error")?;
        let error = Ftl0Error::try_from(raw as u64)
            .map_err(|_| PduParseErr::InvalidValue { field: "error", value: raw as u64 })?;
        Ok(UlStatusResp { packet_type, error })
    }

    pub fn to_buf(&self, buffer: &mut ByteBuffer) {
        Ftl0Header::new(self.packet_type, Self::PAYLOAD_LEN).to_buf(buffer);
        buffer.write_u8(self.error.into_raw() as u8);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(3);
        self.to_buf(&mut buffer);
        buffer.into_bytes()
    }
}

impl fmt::Display for UlStatusResp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {{ error: {} }}", self.packet_type, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nak_body_check() {
        let bytes = UlStatusResp::nak(Ftl0Error::BodyCheck).to_bytes();
        assert_eq!(bytes, vec![0x01, 0x07, 16]);
        let parsed = UlStatusResp::from_buf(&mut ByteBuffer::from_vec(bytes)).unwrap();
        assert_eq!(parsed.packet_type, Ftl0PacketType::UlNakResp);
        assert_eq!(parsed.error, Ftl0Error::BodyCheck);
    }

    #[test]
    fn test_rejects_other_types() {
        let bytes = Ftl0Header::encode_packet(Ftl0PacketType::UlGoResp, &[0]);
        assert!(UlStatusResp::from_buf(&mut ByteBuffer::from_vec(bytes)).is_err());
    }
}
