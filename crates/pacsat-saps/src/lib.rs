#![allow(dead_code)]

/// Primitives between the radio, the frame classifier and the link users
pub mod lm;
/// Connection-oriented data link service, DataLink <-> Uplink
pub mod dl;

pub mod sapmsg;

pub use sapmsg::*;
