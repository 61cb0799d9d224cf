pub mod enums;
pub mod pfh_header;
pub mod pfh_patch;

/// Magic bytes opening every PACSAT File Header
pub const PFH_MAGIC: [u8; 2] = [0xAA, 0x55];

/// No more than this many bytes are ever inspected when decoding a header
pub const MAX_BYTES_IN_PACSAT_FILE_HEADER: usize = 1024;

/// Byte positions of the item id of fixed-position mandatory items
pub const FILE_ID_BYTE_POS: usize = 2;
pub const FILE_SIZE_BYTE_POS: usize = 26;
pub const HEADER_CHECKSUM_BYTE_POS: usize = 60;
pub const BODY_OFFSET_BYTE_POS: usize = 65;

/// Item id (2 bytes) plus length (1 byte)
pub const PFH_ITEM_HDR_LEN: usize = 3;

/// Field widths of the fixed-width text items
pub const PFH_FILE_NAME_LEN: usize = 8;
pub const PFH_FILE_EXT_LEN: usize = 3;
pub const PFH_AX25_CALL_LEN: usize = 7;
