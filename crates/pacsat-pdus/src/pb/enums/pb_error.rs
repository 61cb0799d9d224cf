/// Error numbers sent in "NO -n" responses to broadcast requests
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PbError {
    /// Well-formed request that can not be admitted now (list full, shut, already listed). Retry later.
    Temporary = 1,
    FileNotAvailable = 2,
    FileNotDownloadable = 3,
    InvalidPacket = 5,
}

impl std::convert::TryFrom<u64> for PbError {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(PbError::Temporary),
            2 => Ok(PbError::FileNotAvailable),
            3 => Ok(PbError::FileNotDownloadable),
            5 => Ok(PbError::InvalidPacket),
            _ => Err(()),
        }
    }
}

impl PbError {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<PbError> for u64 {
    fn from(e: PbError) -> Self { e.into_raw() }
}

impl core::fmt::Display for PbError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PbError::Temporary => write!(f, "TEMPORARY"),
            PbError::FileNotAvailable => write!(f, "FILE_NOT_AVAILABLE"),
            PbError::FileNotDownloadable => write!(f, "FILE_NOT_DOWNLOADABLE"),
            PbError::InvalidPacket => write!(f, "INVALID_PACKET"),
        }
    }
}
