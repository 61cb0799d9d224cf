//! AX.25 connected-mode data link, one session per channel
pub mod components;
pub mod datalink_bs;
