pub mod crc16;
pub mod enums;
pub mod pdus;

/// Largest PFH slice carried by one directory broadcast frame
pub const MAX_DIR_PFH_LENGTH: usize = 182;

/// Largest file slice carried by one file broadcast frame
pub const PB_FILE_DEFAULT_BLOCK_SIZE: usize = 191;

/// Hole list limits, bounded by what fits in one frame
pub const MAX_DIR_HOLES: usize = crate::ax25::AX25_MAX_DATA_LEN / DIR_HOLE_LEN;
pub const MAX_FILE_HOLES: usize = crate::ax25::AX25_MAX_DATA_LEN / FILE_HOLE_LEN;

pub const DIR_HOLE_LEN: usize = 8;
pub const FILE_HOLE_LEN: usize = 5;

/// Flag bit: the frame holds the last byte of the PFH or file
pub const PB_FLAG_E: u8 = 1 << 5;
/// Flag bit: the directory entry is the newest on the server
pub const PB_FLAG_N: u8 = 1 << 6;
