/// PFH item identifiers
/// Bits: 16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PfhItemId {
    /// Terminates the item list (with a zero length byte)
    End = 0x00,

    // Mandatory header
    FileId = 0x01,
    FileName = 0x02,
    FileExt = 0x03,
    FileSize = 0x04,
    CreateTime = 0x05,
    LastModTime = 0x06,
    SeuFlag = 0x07,
    FileType = 0x08,
    BodyChecksum = 0x09,
    HeaderChecksum = 0x0A,
    BodyOffset = 0x0B,

    // Extended header
    Source = 0x10,
    Ax25Uploader = 0x11,
    UploadTime = 0x12,
    DownloadCount = 0x13,
    Destination = 0x14,
    Ax25Downloader = 0x15,
    DownloadTime = 0x16,
    ExpireTime = 0x17,
    Priority = 0x18,

    // Optional header
    CompressionType = 0x19,
    BbsMsgType = 0x20,
    BulletinId = 0x21,
    Title = 0x22,
    Keywords = 0x23,
    FileDescription = 0x24,
    CompressionDesc = 0x25,
    UserFileName = 0x26,
}

impl std::convert::TryFrom<u64> for PfhItemId {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0x00 => Ok(PfhItemId::End),
            0x01 => Ok(PfhItemId::FileId),
            0x02 => Ok(PfhItemId::FileName),
            0x03 => Ok(PfhItemId::FileExt),
            0x04 => Ok(PfhItemId::FileSize),
            0x05 => Ok(PfhItemId::CreateTime),
            0x06 => Ok(PfhItemId::LastModTime),
            0x07 => Ok(PfhItemId::SeuFlag),
            0x08 => Ok(PfhItemId::FileType),
            0x09 => Ok(PfhItemId::BodyChecksum),
            0x0A => Ok(PfhItemId::HeaderChecksum),
            0x0B => Ok(PfhItemId::BodyOffset),
            0x10 => Ok(PfhItemId::Source),
            0x11 => Ok(PfhItemId::Ax25Uploader),
            0x12 => Ok(PfhItemId::UploadTime),
            0x13 => Ok(PfhItemId::DownloadCount),
            0x14 => Ok(PfhItemId::Destination),
            0x15 => Ok(PfhItemId::Ax25Downloader),
            0x16 => Ok(PfhItemId::DownloadTime),
            0x17 => Ok(PfhItemId::ExpireTime),
            0x18 => Ok(PfhItemId::Priority),
            0x19 => Ok(PfhItemId::CompressionType),
            0x20 => Ok(PfhItemId::BbsMsgType),
            0x21 => Ok(PfhItemId::BulletinId),
            0x22 => Ok(PfhItemId::Title),
            0x23 => Ok(PfhItemId::Keywords),
            0x24 => Ok(PfhItemId::FileDescription),
            0x25 => Ok(PfhItemId::CompressionDesc),
            0x26 => Ok(PfhItemId::UserFileName),
            _ => Err(()),
        }
    }
}

impl PfhItemId {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u16 as u64
    }
}

impl From<PfhItemId> for u64 {
    fn from(e: PfhItemId) -> Self { e.into_raw() }
}

impl core::fmt::Display for PfhItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}(0x{:02x})", self, self.into_raw())
    }
}
