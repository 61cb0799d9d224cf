/// Body compression
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PfhCompression {
    #[default]
    None = 0,
    PkArc = 1,
    PkZip = 2,
    Gzip = 3,
}

impl std::convert::TryFrom<u64> for PfhCompression {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(PfhCompression::None),
            1 => Ok(PfhCompression::PkArc),
            2 => Ok(PfhCompression::PkZip),
            3 => Ok(PfhCompression::Gzip),
            _ => Err(()),
        }
    }
}

impl PfhCompression {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<PfhCompression> for u64 {
    fn from(e: PfhCompression) -> Self { e.into_raw() }
}

impl core::fmt::Display for PfhCompression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PfhCompression::None => write!(f, "None"),
            PfhCompression::PkArc => write!(f, "PKARC"),
            PfhCompression::PkZip => write!(f, "PKZIP"),
            PfhCompression::Gzip => write!(f, "GZIP"),
        }
    }
}
