//! PACSAT broadcast queue: directory and file downloads for stations that are
//! not connected, served round-robin over the downlink.

pub mod components;
pub mod pb_bs;
