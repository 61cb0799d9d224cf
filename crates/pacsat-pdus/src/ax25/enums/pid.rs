/// AX.25 protocol identifiers used by the PACSAT protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ax25Pid {
    /// PB file request / file broadcast / PB responses
    File = 0xBB,
    /// PB directory request / directory broadcast
    Directory = 0xBD,
    /// Plain text, no layer 3
    NoProtocol = 0xF0,
}

impl std::convert::TryFrom<u64> for Ax25Pid {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0xBB => Ok(Ax25Pid::File),
            0xBD => Ok(Ax25Pid::Directory),
            0xF0 => Ok(Ax25Pid::NoProtocol),
            _ => Err(()),
        }
    }
}

impl Ax25Pid {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u8 {
        self as u8
    }
}

impl From<Ax25Pid> for u64 {
    fn from(e: Ax25Pid) -> Self { e.into_raw() as u64 }
}

impl core::fmt::Display for Ax25Pid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Ax25Pid::File => write!(f, "File"),
            Ax25Pid::Directory => write!(f, "Directory"),
            Ax25Pid::NoProtocol => write!(f, "NoProtocol"),
        }
    }
}
