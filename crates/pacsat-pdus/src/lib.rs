//! Wire codecs for the PACSAT ground link
//!
//! - ax25: AX.25 v2.0 link frames and well-known addresses
//! - ftl0: FTL0 upload protocol packets
//! - pb: PACSAT broadcast requests, responses and broadcast frames
//! - pfh: PACSAT File Header encode/decode

pub mod ax25;
pub mod ftl0;
pub mod pb;
pub mod pfh;
