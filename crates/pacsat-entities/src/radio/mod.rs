//! Radio edge: KISS TNC over TCP, run on a worker thread
pub mod kiss;
pub mod radio_entity;
pub mod worker;
