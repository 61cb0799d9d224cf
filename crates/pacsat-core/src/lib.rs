//! Core utilities for the PACSAT ground-link server
//!
//! This crate provides fundamental types and utilities used across the stack:
//! - ByteBuffer for byte-level PDU manipulation
//! - PacsatTime for stack tick timing and the unix-seconds clock
//! - Callsign (AX.25 station address)
//! - Common macros and debug utilities

pub mod bytebuffer;
pub mod callsign;
pub mod debug;
pub mod pacsat_common;
pub mod pacsat_entities;
pub mod pacsat_time;
pub mod pdu_parse_error;

// Re-export commonly used items
pub use bytebuffer::ByteBuffer;
pub use callsign::Callsign;
pub use pacsat_common::*;
pub use pacsat_time::PacsatTime;
pub use pdu_parse_error::PduParseErr;

/// Seconds since 1970-01-01 UTC, as carried in PFH timestamps and PB requests
pub type UnixTime = u32;

/// Server-assigned file number. Zero is never a valid file id.
pub type FileId = u32;
