use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pacsat_core::{FileId, PduParseErr, UnixTime, assert_warn};
use pacsat_pdus::pfh::MAX_BYTES_IN_PACSAT_FILE_HEADER;
use pacsat_pdus::pfh::enums::pfh_item_id::PfhItemId;
use pacsat_pdus::pfh::pfh_header::PfhHeader;
use pacsat_pdus::pfh::pfh_patch::patch_u32;

use super::file_store::{FileStore, StoreErr, file_name, parse_file_name, read_prefix, tmp_file_name};

/// One file of the directory
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    pub file_id: FileId,
    /// Name of the file in the store
    pub name: String,
    pub body_offset: u16,
    /// Header plus body
    pub file_size: u32,
    pub file_type: u8,
    /// Sort key, unique within the directory
    pub upload_time: UnixTime,
}

impl DirEntry {
    pub fn from_header(file_id: FileId, hdr: &PfhHeader) -> Self {
        Self {
            file_id,
            name: file_name(file_id),
            body_offset: hdr.body_offset,
            file_size: hdr.file_size,
            file_type: hdr.file_type,
            upload_time: hdr.upload_time,
        }
    }
}

#[derive(Debug)]
pub enum DirErr {
    DuplicateUploadTime(UnixTime),
    DuplicateId(FileId),
    NotFound(FileId),
    NoFileId,
    BadChecksum(FileId),
    Store(StoreErr),
    Header(PduParseErr),
}

impl fmt::Display for DirErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirErr::DuplicateUploadTime(t) => write!(f, "duplicate upload time {}", t),
            DirErr::DuplicateId(id) => write!(f, "duplicate file id {:04x}", id),
            DirErr::NotFound(id) => write!(f, "file {:04x} not in directory", id),
            DirErr::NoFileId => write!(f, "no free file id"),
            DirErr::BadChecksum(id) => write!(f, "file {:04x} has a bad header checksum", id),
            DirErr::Store(e) => write!(f, "store: {}", e),
            DirErr::Header(e) => write!(f, "header: {}", e),
        }
    }
}

impl From<StoreErr> for DirErr {
    fn from(e: StoreErr) -> Self {
        DirErr::Store(e)
    }
}

impl From<PduParseErr> for DirErr {
    fn from(e: PduParseErr) -> Self {
        DirErr::Header(e)
    }
}

/// In-memory index over the file store, ordered by upload time.
///
/// Removing an entry never touches the file bytes; deleting them is a separate step
/// through `store_mut()`.
pub struct Directory {
    entries: BTreeMap<UnixTime, DirEntry>,
    by_id: HashMap<FileId, UnixTime>,
    /// Pin counts. A pinned entry is never expired.
    pins: HashMap<FileId, u32>,
    /// Highest file id ever seen, committed or temporary
    highest_id: FileId,
    store: Box<dyn FileStore>,
}

impl Directory {
    pub fn new(store: Box<dyn FileStore>) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_id: HashMap::new(),
            pins: HashMap::new(),
            highest_id: 0,
            store,
        }
    }

    /// Rebuilds the index from the files in the store. Files whose header does not
    /// decode or check are skipped. Returns the number of entries loaded.
    pub fn load(&mut self, now: UnixTime) -> Result<usize, DirErr> {
        let mut loaded = 0;
        for name in self.store.list()? {
            let Some((id, is_tmp)) = parse_file_name(&name) else {
                tracing::warn!("load: ignoring unknown file {}", name);
                continue;
            };
            self.highest_id = self.highest_id.max(id);
            if is_tmp {
                continue;
            }
            match self.load_file(id, now) {
                Ok(entry) => {
                    tracing::debug!("load: {:?}", entry);
                    loaded += 1;
                }
                Err(e) => tracing::warn!("load: skipping {}: {}", name, e),
            }
        }
        tracing::info!("load: {} files in directory, highest id {:04x}", loaded, self.highest_id);
        Ok(loaded)
    }

    fn load_file(&mut self, id: FileId, now: UnixTime) -> Result<DirEntry, DirErr> {
        let name = file_name(id);
        let mut bytes = read_prefix(self.store.as_ref(), &name, MAX_BYTES_IN_PACSAT_FILE_HEADER)?;
        let (mut hdr, consumed, valid) = PfhHeader::decode(&bytes)?;
        if !valid {
            return Err(DirErr::BadChecksum(id));
        }
        let size = self.store.size(&name)?;
        if size != hdr.file_size as u64 {
            return Err(DirErr::Header(PduParseErr::InconsistentLength {
                expected: hdr.file_size as usize,
                found: size as usize,
            }));
        }
        if hdr.upload_time == 0 {
            // Never stamped, it becomes the newest entry
            hdr.upload_time = self.assign_upload_time(now);
            patch_u32(&mut bytes[..consumed], PfhItemId::UploadTime, hdr.upload_time)?;
            self.store.write_at(&name, 0, &bytes[..consumed])?;
        }
        let entry = DirEntry::from_header(id, &hdr);
        self.insert(entry.clone(), now)?;
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest upload time
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.values()
    }

    /// Allocates a file id above every id seen so far, skipping ids that are in the
    /// directory or back a temporary upload file
    pub fn next_file_id(&mut self) -> Option<FileId> {
        let mut candidate = self.highest_id;
        loop {
            candidate = candidate.checked_add(1)?;
            if self.by_id.contains_key(&candidate)
                || self.store.exists(&tmp_file_name(candidate))
                || self.store.exists(&file_name(candidate))
            {
                continue;
            }
            self.highest_id = candidate;
            return Some(candidate);
        }
    }

    /// Upload time for a new newest entry: now, or one second after the newest entry
    fn assign_upload_time(&self, now: UnixTime) -> UnixTime {
        match self.entries.last_key_value() {
            Some((&last, _)) if last >= now => last + 1,
            _ => now,
        }
    }

    /// Adds an entry. An upload time of 0 is replaced by a fresh one; an explicit upload
    /// time that is already taken is rejected. Returns the upload time used.
    pub fn insert(&mut self, mut entry: DirEntry, now: UnixTime) -> Result<UnixTime, DirErr> {
        if self.by_id.contains_key(&entry.file_id) {
            return Err(DirErr::DuplicateId(entry.file_id));
        }
        if entry.upload_time == 0 {
            entry.upload_time = self.assign_upload_time(now);
        } else if self.entries.contains_key(&entry.upload_time) {
            return Err(DirErr::DuplicateUploadTime(entry.upload_time));
        }

        let t = entry.upload_time;
        tracing::debug!("insert: {:04x} at {}", entry.file_id, t);
        self.highest_id = self.highest_id.max(entry.file_id);
        self.by_id.insert(entry.file_id, t);
        self.entries.insert(t, entry);
        Ok(t)
    }

    pub fn find_by_id(&self, id: FileId) -> Option<&DirEntry> {
        self.by_id.get(&id).and_then(|t| self.entries.get(t))
    }

    pub fn find_by_upload_time(&self, t: UnixTime) -> Option<&DirEntry> {
        self.entries.get(&t)
    }

    /// First entry with `start <= upload_time <= end`, strictly after `after` if given
    pub fn find_by_date_range(&self, start: UnixTime, end: UnixTime, after: Option<UnixTime>) -> Option<&DirEntry> {
        let lower = match after {
            Some(a) => start.max(a.checked_add(1)?),
            None => start,
        };
        if lower > end {
            return None;
        }
        self.entries.range(lower..=end).next().map(|(_, e)| e)
    }

    /// Entry closest to a range that holds none: the first one after `end`, else the
    /// last one before `start`. Its neighbours' upload times bound the empty range.
    pub fn find_nearest(&self, start: UnixTime, end: UnixTime) -> Option<&DirEntry> {
        let after = end.checked_add(1).and_then(|from| self.entries.range(from..).next());
        after
            .or_else(|| self.entries.range(..start).next_back())
            .map(|(_, e)| e)
    }

    /// Entry before the one at upload time `t`
    pub fn prev(&self, t: UnixTime) -> Option<&DirEntry> {
        self.entries.range(..t).next_back().map(|(_, e)| e)
    }

    /// Entry after the one at upload time `t`
    pub fn next(&self, t: UnixTime) -> Option<&DirEntry> {
        let from = t.checked_add(1)?;
        self.entries.range(from..).next().map(|(_, e)| e)
    }

    pub fn remove(&mut self, id: FileId) -> Option<DirEntry> {
        let t = self.by_id.remove(&id)?;
        self.pins.remove(&id);
        tracing::debug!("remove: {:04x}", id);
        self.entries.remove(&t)
    }

    pub fn pin(&mut self, id: FileId) {
        *self.pins.entry(id).or_insert(0) += 1;
    }

    pub fn unpin(&mut self, id: FileId) {
        assert_warn!(self.pins.contains_key(&id), "unpin of {:04x} without a pin", id);
        if let Some(count) = self.pins.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.pins.remove(&id);
            }
        }
    }

    pub fn is_pinned(&self, id: FileId) -> bool {
        self.pins.contains_key(&id)
    }

    /// Removes and returns every unpinned entry older than `max_age_secs`
    pub fn expire(&mut self, now: UnixTime, max_age_secs: u64) -> Vec<DirEntry> {
        let expired: Vec<FileId> = self
            .entries
            .values()
            .filter(|e| now.saturating_sub(e.upload_time) as u64 > max_age_secs)
            .filter(|e| !self.is_pinned(e.file_id))
            .map(|e| e.file_id)
            .collect();
        expired.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    pub fn store(&self) -> &dyn FileStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn FileStore {
        self.store.as_mut()
    }

    /// The PFH of a committed file
    pub fn read_header_bytes(&self, entry: &DirEntry) -> Result<Vec<u8>, DirErr> {
        let mut buf = vec![0u8; entry.body_offset as usize];
        let n = self.store.read_at(&entry.name, 0, &mut buf)?;
        if n != buf.len() {
            return Err(DirErr::Store(StoreErr::Io(format!("{} truncated", entry.name))));
        }
        Ok(buf)
    }

    /// Up to `len` bytes of a committed file, starting at `offset`
    pub fn read_chunk(&self, entry: &DirEntry, offset: u32, len: usize) -> Result<Vec<u8>, DirErr> {
        let mut buf = vec![0u8; len];
        let n = self.store.read_at(&entry.name, offset as u64, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Turns a complete temporary upload into a directory entry: renames it, stamps
    /// the file id and a fresh upload time into its header and inserts it.
    /// On failure after the rename the final file is deleted.
    pub fn commit_upload(&mut self, id: FileId, now: UnixTime) -> Result<DirEntry, DirErr> {
        let tmp = tmp_file_name(id);
        let name = file_name(id);
        let hdr_bytes = read_prefix(self.store.as_ref(), &tmp, MAX_BYTES_IN_PACSAT_FILE_HEADER)?;
        let (hdr, consumed, valid) = PfhHeader::decode(&hdr_bytes)?;
        if !valid {
            return Err(DirErr::BadChecksum(id));
        }

        self.store.rename(&tmp, &name)?;
        let upload_time = self.assign_upload_time(now);
        match self.stamp_and_insert(id, hdr_bytes[..consumed].to_vec(), hdr, upload_time, now) {
            Ok(entry) => {
                tracing::info!("commit_upload: {:04x} size {} upload time {}", id, entry.file_size, entry.upload_time);
                Ok(entry)
            }
            Err(e) => {
                if let Err(rm) = self.store.remove(&name) {
                    tracing::warn!("commit_upload: could not remove {}: {}", name, rm);
                }
                Err(e)
            }
        }
    }

    fn stamp_and_insert(
        &mut self,
        id: FileId,
        mut hdr_bytes: Vec<u8>,
        mut hdr: PfhHeader,
        upload_time: UnixTime,
        now: UnixTime,
    ) -> Result<DirEntry, DirErr> {
        patch_u32(&mut hdr_bytes, PfhItemId::FileId, id)?;
        patch_u32(&mut hdr_bytes, PfhItemId::UploadTime, upload_time)?;
        self.store.write_at(&file_name(id), 0, &hdr_bytes)?;
        hdr.file_id = id;
        hdr.upload_time = upload_time;
        let entry = DirEntry::from_header(id, &hdr);
        self.insert(entry.clone(), now)?;
        Ok(entry)
    }

    /// Stores a file generated by the server itself. A file id and upload time are
    /// assigned, and the header is encoded for `body`.
    pub fn add_file(&mut self, header: &mut PfhHeader, body: &[u8], now: UnixTime) -> Result<DirEntry, DirErr> {
        let id = self.next_file_id().ok_or(DirErr::NoFileId)?;
        header.file_id = id;
        header.upload_time = self.assign_upload_time(now);
        let bytes = header.encode_with_body(body)?;

        let name = file_name(id);
        self.store.create(&name)?;
        if let Err(e) = self.store.write_at(&name, 0, &bytes) {
            let _ = self.store.remove(&name);
            return Err(e.into());
        }
        let entry = DirEntry::from_header(id, header);
        self.insert(entry.clone(), now)?;
        Ok(entry)
    }

    /// Records a completed download in the stored header
    pub fn stamp_download(&mut self, id: FileId, now: UnixTime) -> Result<(), DirErr> {
        let entry = self.find_by_id(id).cloned().ok_or(DirErr::NotFound(id))?;
        let mut hdr_bytes = self.read_header_bytes(&entry)?;
        patch_u32(&mut hdr_bytes, PfhItemId::DownloadTime, now)?;
        self.store.write_at(&entry.name, 0, &hdr_bytes)?;
        Ok(())
    }
}

/// Directory shared between the upload and broadcast entities
#[derive(Clone)]
pub struct SharedDir {
    inner: Arc<RwLock<Directory>>,
}

impl SharedDir {
    pub fn new(dir: Directory) -> Self {
        Self { inner: Arc::new(RwLock::new(dir)) }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Directory> {
        self.inner.read().expect("Directory RwLock blocked")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Directory> {
        self.inner.write().expect("Directory RwLock blocked")
    }
}

#[cfg(test)]
mod tests {
    use pacsat_core::debug;
    use pacsat_pdus::pfh::enums::pfh_compression::PfhCompression;
    use pacsat_pdus::pfh::pfh_header::{InternalFileParams, make_internal_header};

    use crate::dir::file_store::MemFileStore;

    use super::*;

    fn entry(id: FileId, upload_time: UnixTime) -> DirEntry {
        DirEntry { file_id: id, name: file_name(id), body_offset: 0, file_size: 0, file_type: 0, upload_time }
    }

    fn new_dir() -> Directory {
        Directory::new(Box::new(MemFileStore::new(1 << 20)))
    }

    fn internal_header(title: &str) -> PfhHeader {
        make_internal_header(
            0,
            &InternalFileParams {
                file_id: 0,
                file_type: 0,
                file_name: "TEST",
                source: "PACSAT",
                destination: "ALL",
                title,
                user_file_name: "",
                expire_time: 0,
                compression: PfhCompression::None,
            },
        )
    }

    fn upload_times(dir: &Directory) -> Vec<UnixTime> {
        dir.iter().map(|e| e.upload_time).collect()
    }

    #[test]
    fn test_insert_keeps_order() {
        debug::setup_logging_verbose();
        let mut dir = new_dir();
        dir.insert(entry(1, 300), 1000).unwrap();
        dir.insert(entry(2, 100), 1000).unwrap();
        dir.insert(entry(3, 200), 1000).unwrap();
        dir.insert(entry(4, 0), 1000).unwrap();
        dir.insert(entry(5, 0), 1000).unwrap();
        assert!(dir.remove(3).is_some());
        dir.insert(entry(6, 150), 1000).unwrap();

        let times = upload_times(&dir);
        assert_eq!(times, vec![100, 150, 300, 1000, 1001]);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut dir = new_dir();
        dir.insert(entry(1, 300), 1000).unwrap();
        assert!(matches!(dir.insert(entry(2, 300), 1000), Err(DirErr::DuplicateUploadTime(300))));
        assert!(matches!(dir.insert(entry(1, 400), 1000), Err(DirErr::DuplicateId(1))));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_next_file_id_skips_used() {
        let mut dir = new_dir();
        dir.insert(entry(1, 100), 1000).unwrap();
        assert_eq!(dir.next_file_id(), Some(2));
        dir.store_mut().create(&tmp_file_name(3)).unwrap();
        dir.store_mut().create(&tmp_file_name(4)).unwrap();
        assert_eq!(dir.next_file_id(), Some(5));
        // Never reused, even if 2 was not taken
        assert_eq!(dir.next_file_id(), Some(6));
    }

    #[test]
    fn test_date_range() {
        let mut dir = new_dir();
        for (id, t) in [(1, 100), (2, 160), (3, 180), (4, 240)] {
            dir.insert(entry(id, t), 1000).unwrap();
        }
        assert_eq!(dir.find_by_date_range(150, 200, None).map(|e| e.file_id), Some(2));
        assert_eq!(dir.find_by_date_range(150, 200, Some(160)).map(|e| e.file_id), Some(3));
        assert_eq!(dir.find_by_date_range(150, 200, Some(180)), None);
        assert_eq!(dir.find_by_date_range(100, 100, None).map(|e| e.file_id), Some(1));
        assert_eq!(dir.find_by_date_range(200, 150, None), None);

        assert_eq!(dir.find_by_date_range(190, 230, None), None);
        assert_eq!(dir.find_nearest(190, 230).map(|e| e.file_id), Some(4));
        assert_eq!(dir.find_nearest(300, 400).map(|e| e.file_id), Some(4));
        assert_eq!(dir.prev(180).map(|e| e.file_id), Some(2));
        assert_eq!(dir.next(180).map(|e| e.file_id), Some(4));
        assert_eq!(dir.next(240), None);
    }

    #[test]
    fn test_expire_respects_pins() {
        let mut dir = new_dir();
        dir.insert(entry(1, 100), 1000).unwrap();
        dir.insert(entry(2, 200), 1000).unwrap();
        dir.insert(entry(3, 900), 1000).unwrap();
        dir.pin(2);
        dir.pin(2);
        dir.unpin(2);

        let expired = dir.expire(1000, 500);
        assert_eq!(expired.iter().map(|e| e.file_id).collect::<Vec<_>>(), vec![1]);
        dir.unpin(2);
        let expired = dir.expire(1000, 500);
        assert_eq!(expired.iter().map(|e| e.file_id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(dir.len(), 1);

        // An unbalanced unpin only warns
        dir.unpin(3);
        assert!(!dir.is_pinned(3));
    }

    #[test]
    fn test_add_file_and_reload() {
        let mut dir = new_dir();
        let mut hdr = internal_header("first");
        let e1 = dir.add_file(&mut hdr, b"hello", 5000).unwrap();
        let mut hdr = internal_header("second");
        let e2 = dir.add_file(&mut hdr, b"world!", 5000).unwrap();
        assert_eq!(e2.upload_time, e1.upload_time + 1);
        assert_eq!(e1.file_size, e1.body_offset as u32 + 5);

        // A broken file and an upload in progress
        dir.store_mut().create("00000099").unwrap();
        dir.store_mut().write_at("00000099", 0, &[0xAA, 0x55, 1, 0]).unwrap();
        dir.store_mut().create(&tmp_file_name(0x120)).unwrap();

        let Directory { store, .. } = dir;
        let mut reloaded = Directory::new(store);
        assert_eq!(reloaded.load(6000).unwrap(), 2);
        assert_eq!(reloaded.find_by_id(e1.file_id), Some(&e1));
        assert_eq!(reloaded.find_by_id(e2.file_id), Some(&e2));
        assert_eq!(reloaded.next_file_id(), Some(0x121));
    }

    #[test]
    fn test_commit_upload_stamps_header() {
        let mut dir = new_dir();
        dir.insert(entry(1, 7000), 7000).unwrap();

        let mut hdr = internal_header("upload");
        let bytes = hdr.encode_with_body(b"payload").unwrap();
        let id = dir.next_file_id().unwrap();
        dir.store_mut().create(&tmp_file_name(id)).unwrap();
        dir.store_mut().write_at(&tmp_file_name(id), 0, &bytes).unwrap();

        let committed = dir.commit_upload(id, 7000).unwrap();
        assert_eq!(committed.upload_time, 7001);
        assert!(!dir.store().exists(&tmp_file_name(id)));

        let stored = read_prefix(dir.store(), &file_name(id), 2048).unwrap();
        let (decoded, _, valid) = PfhHeader::decode(&stored).unwrap();
        assert!(valid);
        assert_eq!(decoded.file_id, id);
        assert_eq!(decoded.upload_time, 7001);
        assert_eq!(&stored[decoded.body_offset as usize..], b"payload");

        dir.stamp_download(id, 8000).unwrap();
        let stored = read_prefix(dir.store(), &file_name(id), 2048).unwrap();
        let (decoded, _, valid) = PfhHeader::decode(&stored).unwrap();
        assert!(valid);
        assert_eq!(decoded.download_time, 8000);
    }
}
