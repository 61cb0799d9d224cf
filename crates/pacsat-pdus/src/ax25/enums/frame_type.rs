/// AX.25 v2.0 frame types, keyed by the control field with N(R), N(S) and P/F masked out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ax25FrameType {
    /// Information
    I = 0x00,
    /// Receive Ready
    Rr = 0x01,
    /// Receive Not Ready
    Rnr = 0x05,
    /// Reject
    Rej = 0x09,
    /// Selective Reject
    Srej = 0x0D,
    /// Set Asynchronous Balanced Mode Extended (modulo 128)
    Sabme = 0x6F,
    /// Set Asynchronous Balanced Mode
    Sabm = 0x2F,
    /// Disconnect
    Disc = 0x43,
    /// Disconnected Mode
    Dm = 0x0F,
    /// Unnumbered Acknowledge
    Ua = 0x63,
    /// Frame Reject
    Frmr = 0x87,
    /// Unnumbered Information
    Ui = 0x03,
    /// Exchange Identification
    Xid = 0xAF,
    Test = 0xE3,
}

impl Ax25FrameType {
    /// Classifies a raw control byte
    pub fn from_control(control: u8) -> Option<Self> {
        if control & 0x01 == 0 {
            return Some(Ax25FrameType::I);
        }
        if control & 0x03 == 0x01 {
            return Self::try_from((control & 0x0F) as u64).ok();
        }
        Self::try_from((control & 0xEF) as u64).ok()
    }

    pub fn is_supervisory(self) -> bool {
        matches!(self, Ax25FrameType::Rr | Ax25FrameType::Rnr | Ax25FrameType::Rej | Ax25FrameType::Srej)
    }

    pub fn is_unnumbered(self) -> bool {
        !self.is_supervisory() && self != Ax25FrameType::I
    }

    /// Frame carries a PID byte followed by an information field
    pub fn has_pid(self) -> bool {
        matches!(self, Ax25FrameType::I | Ax25FrameType::Ui)
    }
}

impl std::convert::TryFrom<u64> for Ax25FrameType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0x00 => Ok(Ax25FrameType::I),
            0x01 => Ok(Ax25FrameType::Rr),
            0x05 => Ok(Ax25FrameType::Rnr),
            0x09 => Ok(Ax25FrameType::Rej),
            0x0D => Ok(Ax25FrameType::Srej),
            0x6F => Ok(Ax25FrameType::Sabme),
            0x2F => Ok(Ax25FrameType::Sabm),
            0x43 => Ok(Ax25FrameType::Disc),
            0x0F => Ok(Ax25FrameType::Dm),
            0x63 => Ok(Ax25FrameType::Ua),
            0x87 => Ok(Ax25FrameType::Frmr),
            0x03 => Ok(Ax25FrameType::Ui),
            0xAF => Ok(Ax25FrameType::Xid),
            0xE3 => Ok(Ax25FrameType::Test),
            _ => Err(()),
        }
    }
}

impl Ax25FrameType {
    /// Convert this enum back into the raw control base value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<Ax25FrameType> for u64 {
    fn from(e: Ax25FrameType) -> Self { e.into_raw() }
}

impl core::fmt::Display for Ax25FrameType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Ax25FrameType::I => write!(f, "I"),
            Ax25FrameType::Rr => write!(f, "RR"),
            Ax25FrameType::Rnr => write!(f, "RNR"),
            Ax25FrameType::Rej => write!(f, "REJ"),
            Ax25FrameType::Srej => write!(f, "SREJ"),
            Ax25FrameType::Sabme => write!(f, "SABME"),
            Ax25FrameType::Sabm => write!(f, "SABM"),
            Ax25FrameType::Disc => write!(f, "DISC"),
            Ax25FrameType::Dm => write!(f, "DM"),
            Ax25FrameType::Ua => write!(f, "UA"),
            Ax25FrameType::Frmr => write!(f, "FRMR"),
            Ax25FrameType::Ui => write!(f, "UI"),
            Ax25FrameType::Xid => write!(f, "XID"),
            Ax25FrameType::Test => write!(f, "TEST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_control() {
        assert_eq!(Ax25FrameType::from_control(0x3F), Some(Ax25FrameType::Sabm)); // SABM P=1
        assert_eq!(Ax25FrameType::from_control(0x73), Some(Ax25FrameType::Ua));   // UA F=1
        assert_eq!(Ax25FrameType::from_control(0xB1), Some(Ax25FrameType::Rr));   // RR N(R)=5 P=1
        assert_eq!(Ax25FrameType::from_control(0x46), Some(Ax25FrameType::I));    // I N(R)=2 N(S)=3
        assert_eq!(Ax25FrameType::from_control(0x13), Some(Ax25FrameType::Ui));
        assert_eq!(Ax25FrameType::from_control(0x07), None);
    }
}
