/// File type tags used by the server itself. Uploaded files may carry any other value.
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PfhFileType {
    Ascii = 0,
    /// Broadcast log
    BroadcastLog = 202,
    /// Whole-orbit telemetry log
    WodLog = 203,
    Images = 211,
    /// Admin log
    AdminLog = 223,
}

impl std::convert::TryFrom<u64> for PfhFileType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(PfhFileType::Ascii),
            202 => Ok(PfhFileType::BroadcastLog),
            203 => Ok(PfhFileType::WodLog),
            211 => Ok(PfhFileType::Images),
            223 => Ok(PfhFileType::AdminLog),
            _ => Err(()),
        }
    }
}

impl PfhFileType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<PfhFileType> for u64 {
    fn from(e: PfhFileType) -> Self { e.into_raw() }
}

impl core::fmt::Display for PfhFileType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PfhFileType::Ascii => write!(f, "ASCII"),
            PfhFileType::BroadcastLog => write!(f, "BL"),
            PfhFileType::WodLog => write!(f, "WL"),
            PfhFileType::Images => write!(f, "IMAGES"),
            PfhFileType::AdminLog => write!(f, "AL"),
        }
    }
}
