use core::fmt;

use pacsat_core::{ByteBuffer, PduParseErr, UnixTime};

use crate::ftl0::enums::ftl0_packet_type::Ftl0PacketType;
use crate::ftl0::ftl0_header::{Ftl0Header, read_fixed_header};

/// Protocol version bits (1..0) and the HeaderPFH bit (2): PFHs are used and required
pub const LOGIN_FLAGS_PFH_REQUIRED: u8 = 0b0000_0111;

/// LOGIN_RESP, sent by the server as soon as the data link is up
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResp {
    pub login_time: UnixTime,
    /// bit: 76543210 = xxxxSHVV
    pub login_flags: u8,
}

impl LoginResp {
    const PAYLOAD_LEN: usize = 5;

    pub fn from_buf(buffer: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        read_fixed_header(buffer, Ftl0PacketType::LoginResp, Self::PAYLOAD_LEN)?;
        let login_time = buffer.read_u32("login_time")?;
        let login_flags = buffer.read_u8("login_flags")?;
        Ok(LoginResp { login_time, login_flags })
    }

    pub fn to_buf(&self, buffer: &mut ByteBuffer) {
        Ftl0Header::new(Ftl0PacketType::LoginResp, Self::PAYLOAD_LEN).to_buf(buffer);
        buffer.write_u32(self.login_time);
        buffer.write_u8(self.login_flags);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new_autoexpand(7);
        self.to_buf(&mut buffer);
        buffer.into_bytes()
    }
}

impl fmt::Display for LoginResp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LoginResp {{ login_time: {} login_flags: {:08b} }}", self.login_time, self.login_flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_resp() {
        let pdu = LoginResp { login_time: 0x5F5E_1000, login_flags: LOGIN_FLAGS_PFH_REQUIRED };
        let bytes = pdu.to_bytes();
        assert_eq!(bytes, vec![0x05, 0x02, 0x00, 0x10, 0x5E, 0x5F, 0x07]);
        let parsed = LoginResp::from_buf(&mut ByteBuffer::from_vec(bytes)).unwrap();
        assert_eq!(parsed, pdu);
    }
}
