/// FTL0 packet types
/// Bits: 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ftl0PacketType {
    Data = 0,
    DataEnd = 1,
    LoginResp = 2,
    UploadCmd = 3,
    UlGoResp = 4,
    UlErrorResp = 5,
    UlAckResp = 6,
    UlNakResp = 7,
}

impl std::convert::TryFrom<u64> for Ftl0PacketType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Ftl0PacketType::Data),
            1 => Ok(Ftl0PacketType::DataEnd),
            2 => Ok(Ftl0PacketType::LoginResp),
            3 => Ok(Ftl0PacketType::UploadCmd),
            4 => Ok(Ftl0PacketType::UlGoResp),
            5 => Ok(Ftl0PacketType::UlErrorResp),
            6 => Ok(Ftl0PacketType::UlAckResp),
            7 => Ok(Ftl0PacketType::UlNakResp),
            _ => Err(()),
        }
    }
}

impl Ftl0PacketType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<Ftl0PacketType> for u64 {
    fn from(e: Ftl0PacketType) -> Self { e.into_raw() }
}

impl core::fmt::Display for Ftl0PacketType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Ftl0PacketType::Data => write!(f, "DATA"),
            Ftl0PacketType::DataEnd => write!(f, "DATA_END"),
            Ftl0PacketType::LoginResp => write!(f, "LOGIN_RESP"),
            Ftl0PacketType::UploadCmd => write!(f, "UPLOAD_CMD"),
            Ftl0PacketType::UlGoResp => write!(f, "UL_GO_RESP"),
            Ftl0PacketType::UlErrorResp => write!(f, "UL_ERROR_RESP"),
            Ftl0PacketType::UlAckResp => write!(f, "UL_ACK_RESP"),
            Ftl0PacketType::UlNakResp => write!(f, "UL_NAK_RESP"),
        }
    }
}
