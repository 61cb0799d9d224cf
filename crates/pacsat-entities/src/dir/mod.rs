//! Directory of committed files, ordered by upload time, over a pluggable file store

pub mod directory;
pub mod file_store;

pub use directory::{DirEntry, DirErr, Directory, SharedDir};
pub use file_store::{FileStore, FsFileStore, MemFileStore, StoreErr};
