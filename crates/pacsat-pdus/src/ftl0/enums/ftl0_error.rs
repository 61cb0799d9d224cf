/// FTL0 error codes carried in UL_ERROR_RESP / UL_NAK_RESP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ftl0Error {
    None = 0,
    IllFormedCmd = 1,
    BadContinue = 2,
    ServerFsys = 3,
    NoSuchFileNumber = 4,
    SelectionEmpty1 = 5,
    MandatoryFieldMissing = 6,
    NoPfh = 7,
    PoorlyFormedSel = 8,
    AlreadyLocked = 9,
    NoSuchDestination = 10,
    SelectionEmpty2 = 11,
    FileComplete = 12,
    NoRoom = 13,
    BadHeader = 14,
    HeaderCheck = 15,
    BodyCheck = 16,
}

impl std::convert::TryFrom<u64> for Ftl0Error {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Ftl0Error::None),
            1 => Ok(Ftl0Error::IllFormedCmd),
            2 => Ok(Ftl0Error::BadContinue),
            3 => Ok(Ftl0Error::ServerFsys),
            4 => Ok(Ftl0Error::NoSuchFileNumber),
            5 => Ok(Ftl0Error::SelectionEmpty1),
            6 => Ok(Ftl0Error::MandatoryFieldMissing),
            7 => Ok(Ftl0Error::NoPfh),
            8 => Ok(Ftl0Error::PoorlyFormedSel),
            9 => Ok(Ftl0Error::AlreadyLocked),
            10 => Ok(Ftl0Error::NoSuchDestination),
            11 => Ok(Ftl0Error::SelectionEmpty2),
            12 => Ok(Ftl0Error::FileComplete),
            13 => Ok(Ftl0Error::NoRoom),
            14 => Ok(Ftl0Error::BadHeader),
            15 => Ok(Ftl0Error::HeaderCheck),
            16 => Ok(Ftl0Error::BodyCheck),
            _ => Err(()),
        }
    }
}

impl Ftl0Error {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u8 as u64
    }
}

impl From<Ftl0Error> for u64 {
    fn from(e: Ftl0Error) -> Self { e.into_raw() }
}

impl core::fmt::Display for Ftl0Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Ftl0Error::None => write!(f, "None"),
            Ftl0Error::IllFormedCmd => write!(f, "IllFormedCmd"),
            Ftl0Error::BadContinue => write!(f, "BadContinue"),
            Ftl0Error::ServerFsys => write!(f, "ServerFsys"),
            Ftl0Error::NoSuchFileNumber => write!(f, "NoSuchFileNumber"),
            Ftl0Error::SelectionEmpty1 => write!(f, "SelectionEmpty1"),
            Ftl0Error::MandatoryFieldMissing => write!(f, "MandatoryFieldMissing"),
            Ftl0Error::NoPfh => write!(f, "NoPfh"),
            Ftl0Error::PoorlyFormedSel => write!(f, "PoorlyFormedSel"),
            Ftl0Error::AlreadyLocked => write!(f, "AlreadyLocked"),
            Ftl0Error::NoSuchDestination => write!(f, "NoSuchDestination"),
            Ftl0Error::SelectionEmpty2 => write!(f, "SelectionEmpty2"),
            Ftl0Error::FileComplete => write!(f, "FileComplete"),
            Ftl0Error::NoRoom => write!(f, "NoRoom"),
            Ftl0Error::BadHeader => write!(f, "BadHeader"),
            Ftl0Error::HeaderCheck => write!(f, "HeaderCheck"),
            Ftl0Error::BodyCheck => write!(f, "BodyCheck"),
        }
    }
}
