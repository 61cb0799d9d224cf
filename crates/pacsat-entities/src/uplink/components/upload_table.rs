use core::fmt;

use pacsat_core::{Callsign, FileId, UnixTime};

/// An upload that has been given a file id and not yet finished. Kept across
/// disconnects so the station can continue where it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    pub file_id: FileId,
    pub callsign: Callsign,
    /// Declared total length
    pub length: u32,
    /// Bytes received so far
    pub offset: u32,
    /// Last time the station asked for or sent data
    pub request_time: UnixTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTableErr {
    /// Every record belongs to a station that is uploading right now
    Full,
    DuplicateId(FileId),
}

impl fmt::Display for UploadTableErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadTableErr::Full => write!(f, "upload table full"),
            UploadTableErr::DuplicateId(id) => write!(f, "upload record for {:04x} exists", id),
        }
    }
}

pub struct UploadTable {
    records: Vec<UploadRecord>,
    max_records: usize,
}

impl UploadTable {
    pub fn new(max_records: usize) -> Self {
        Self { records: Vec::with_capacity(max_records), max_records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, file_id: FileId) -> Option<&UploadRecord> {
        self.records.iter().find(|r| r.file_id == file_id)
    }

    pub fn get_mut(&mut self, file_id: FileId) -> Option<&mut UploadRecord> {
        self.records.iter_mut().find(|r| r.file_id == file_id)
    }

    /// Adds a record. When the table is full the oldest record whose file is not in
    /// `active` is replaced and returned, so the caller can delete its temporary file.
    pub fn add(&mut self, record: UploadRecord, active: &[FileId]) -> Result<Option<UploadRecord>, UploadTableErr> {
        if self.get(record.file_id).is_some() {
            return Err(UploadTableErr::DuplicateId(record.file_id));
        }
        if self.records.len() < self.max_records {
            self.records.push(record);
            return Ok(None);
        }

        let oldest = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| !active.contains(&r.file_id))
            .min_by_key(|(_, r)| r.request_time)
            .map(|(i, _)| i);
        match oldest {
            Some(i) => {
                let evicted = std::mem::replace(&mut self.records[i], record);
                tracing::info!("UploadTable: replaced record for {:04x} from {}", evicted.file_id, evicted.callsign);
                Ok(Some(evicted))
            }
            None => Err(UploadTableErr::Full),
        }
    }

    pub fn remove(&mut self, file_id: FileId) -> Option<UploadRecord> {
        let i = self.records.iter().position(|r| r.file_id == file_id)?;
        Some(self.records.swap_remove(i))
    }

    /// Store space promised to unfinished uploads
    pub fn reserved_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.length.saturating_sub(r.offset) as u64).sum()
    }

    /// Drops records not refreshed for `max_age_secs`, except those in `active`,
    /// and returns them
    pub fn purge(&mut self, now: UnixTime, max_age_secs: u64, active: &[FileId]) -> Vec<UploadRecord> {
        let (expired, kept): (Vec<_>, Vec<_>) = self.records.drain(..).partition(|r| {
            !active.contains(&r.file_id) && (now.saturating_sub(r.request_time) as u64) > max_age_secs
        });
        self.records = kept;
        expired
    }
}
