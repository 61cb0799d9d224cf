pub mod address;
pub mod enums;
pub mod frame;
pub mod well_known;

/// Maximum information bytes in an I frame
pub const AX25_MAX_INFO_BYTES_LEN: usize = 223;
/// Maximum information bytes accepted in a UI frame
pub const AX25_MAX_DATA_LEN: usize = 240;
/// Destination + source address fields plus control
pub const AX25_MIN_FRAME_LEN: usize = 15;
/// Largest information field of any frame on the TNC link
pub const AX25_MAX_FRAME_INFO_LEN: usize = 256;
