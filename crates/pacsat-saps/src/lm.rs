// Link-medium primitives: raw and decoded AX.25 frames between the radio edge,
// the classifier, the data link and the broadcast queue
use pacsat_core::ChannelId;
use pacsat_pdus::ax25::frame::Ax25Frame;

/// A frame as received from the TNC, not yet decoded
#[derive(Debug)]
pub struct LmRawInd {
    pub channel: ChannelId,
    pub data: Vec<u8>,
}

/// A decoded frame, routed on its destination address
#[derive(Debug)]
pub struct LmFrameInd {
    pub channel: ChannelId,
    pub frame: Ax25Frame,
}

/// An encoded frame to transmit
#[derive(Debug)]
pub struct LmTxReq {
    pub channel: ChannelId,
    pub data: Vec<u8>,
    /// Link control traffic that should not wait behind bulk broadcast data
    pub expedited: bool,
}
