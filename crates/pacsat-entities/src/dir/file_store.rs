use core::fmt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use pacsat_core::FileId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreErr {
    NotFound,
    NoSpace,
    Io(String),
}

impl fmt::Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErr::NotFound => write!(f, "file not found"),
            StoreErr::NoSpace => write!(f, "no space left in store"),
            StoreErr::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl From<io::Error> for StoreErr {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => StoreErr::NotFound,
            io::ErrorKind::StorageFull => StoreErr::NoSpace,
            _ => StoreErr::Io(e.to_string()),
        }
    }
}

/// Name of a committed file
pub fn file_name(id: FileId) -> String {
    format!("{:08x}", id)
}

/// Name of a file that is still being uploaded
pub fn tmp_file_name(id: FileId) -> String {
    format!("{:08x}.tmp", id)
}

/// Parses a store name. Returns the file id and whether it is a temporary file.
pub fn parse_file_name(name: &str) -> Option<(FileId, bool)> {
    let (stem, is_tmp) = match name.strip_suffix(".tmp") {
        Some(stem) => (stem, true),
        None => (name, false),
    };
    if stem.len() != 8 {
        return None;
    }
    FileId::from_str_radix(stem, 16).ok().map(|id| (id, is_tmp))
}

/// Flat namespace of byte files, the backing store of the directory
pub trait FileStore: Send + Sync {
    /// Creates an empty file, truncating any existing one
    fn create(&mut self, name: &str) -> Result<(), StoreErr>;

    /// Writes `data` at `offset`, growing the file as needed
    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> Result<(), StoreErr>;

    /// Reads up to `buf.len()` bytes from `offset`. Returns the number of bytes read,
    /// short only at the end of the file.
    fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StoreErr>;

    fn size(&self, name: &str) -> Result<u64, StoreErr>;

    fn exists(&self, name: &str) -> bool;

    fn remove(&mut self, name: &str) -> Result<(), StoreErr>;

    /// Renames `from` to `to`, replacing `to` if it exists
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreErr>;

    fn list(&self) -> Result<Vec<String>, StoreErr>;

    /// Bytes that can still be written
    fn free_space(&self) -> u64;
}

/// Reads a whole file, or its first `max_len` bytes
pub fn read_prefix(store: &dyn FileStore, name: &str, max_len: usize) -> Result<Vec<u8>, StoreErr> {
    let size = store.size(name)? as usize;
    let mut buf = vec![0u8; usize::min(size, max_len)];
    let n = store.read_at(name, 0, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// In-memory store with a fixed capacity
pub struct MemFileStore {
    files: HashMap<String, Vec<u8>>,
    capacity: u64,
}

impl MemFileStore {
    pub fn new(capacity: u64) -> Self {
        Self { files: HashMap::new(), capacity }
    }

    fn used(&self) -> u64 {
        self.files.values().map(|f| f.len() as u64).sum()
    }
}

impl FileStore for MemFileStore {
    fn create(&mut self, name: &str) -> Result<(), StoreErr> {
        self.files.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> Result<(), StoreErr> {
        let free = self.free_space();
        let file = self.files.get_mut(name).ok_or(StoreErr::NotFound)?;
        let end = offset as usize + data.len();
        let growth = end.saturating_sub(file.len()) as u64;
        if growth > free {
            return Err(StoreErr::NoSpace);
        }
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StoreErr> {
        let file = self.files.get(name).ok_or(StoreErr::NotFound)?;
        let start = usize::min(offset as usize, file.len());
        let n = usize::min(buf.len(), file.len() - start);
        buf[..n].copy_from_slice(&file[start..start + n]);
        Ok(n)
    }

    fn size(&self, name: &str) -> Result<u64, StoreErr> {
        self.files.get(name).map(|f| f.len() as u64).ok_or(StoreErr::NotFound)
    }

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreErr> {
        self.files.remove(name).map(|_| ()).ok_or(StoreErr::NotFound)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreErr> {
        let data = self.files.remove(from).ok_or(StoreErr::NotFound)?;
        self.files.insert(to.to_string(), data);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreErr> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    fn free_space(&self) -> u64 {
        self.capacity.saturating_sub(self.used())
    }
}

/// Store backed by a directory on disk. `capacity` bounds the total size of the files in it.
pub struct FsFileStore {
    root: PathBuf,
    capacity: u64,
}

impl FsFileStore {
    /// Opens the store, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P, capacity: u64) -> Result<Self, StoreErr> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        tracing::info!("FsFileStore: using {}", root.display());
        Ok(Self { root, capacity })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn used(&self) -> u64 {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }
}

impl FileStore for FsFileStore {
    fn create(&mut self, name: &str) -> Result<(), StoreErr> {
        File::create(self.path(name))?;
        Ok(())
    }

    fn write_at(&mut self, name: &str, offset: u64, data: &[u8]) -> Result<(), StoreErr> {
        let path = self.path(name);
        let current = fs::metadata(&path)?.len();
        let growth = (offset + data.len() as u64).saturating_sub(current);
        if growth > self.free_space() {
            return Err(StoreErr::NoSpace);
        }
        let mut f = OpenOptions::new().write(true).open(&path)?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }

    fn read_at(&self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize, StoreErr> {
        let mut f = File::open(self.path(name))?;
        f.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            let n = f.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn size(&self, name: &str) -> Result<u64, StoreErr> {
        Ok(fs::metadata(self.path(name))?.len())
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn remove(&mut self, name: &str) -> Result<(), StoreErr> {
        fs::remove_file(self.path(name))?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StoreErr> {
        fs::rename(self.path(from), self.path(to))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreErr> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    fn free_space(&self) -> u64 {
        self.capacity.saturating_sub(self.used())
    }
}
