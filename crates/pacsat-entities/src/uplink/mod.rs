//! FTL0 file upload over the connected data link
pub mod components;
pub mod uplink_bs;
