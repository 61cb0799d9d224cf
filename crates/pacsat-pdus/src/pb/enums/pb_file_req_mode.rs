/// Low two flag bits of a file request
/// Bits: 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PbFileReqMode {
    /// Broadcast the whole file
    StartSending = 0b00,
    /// Stop the requester's own broadcast of the file
    StopSending = 0b01,
    /// Broadcast the listed holes
    HoleList = 0b10,
}

impl std::convert::TryFrom<u64> for PbFileReqMode {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0b00 => Ok(PbFileReqMode::StartSending),
            0b01 => Ok(PbFileReqMode::StopSending),
            0b10 => Ok(PbFileReqMode::HoleList),
            _ => Err(()),
        }
    }
}

impl PbFileReqMode {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<PbFileReqMode> for u64 {
    fn from(e: PbFileReqMode) -> Self { e.into_raw() }
}

impl core::fmt::Display for PbFileReqMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PbFileReqMode::StartSending => write!(f, "StartSending"),
            PbFileReqMode::StopSending => write!(f, "StopSending"),
            PbFileReqMode::HoleList => write!(f, "HoleList"),
        }
    }
}
