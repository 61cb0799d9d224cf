// Data-link service primitives, one connection per channel
use core::fmt;

use pacsat_core::{Callsign, ChannelId};

/// AX.25 data-link error indications (A to V), plus local queue overflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlErrorCode {
    /// F=1 received but P=1 not outstanding
    A,
    /// Unexpected DM with F=1 in states Connected or TimerRecovery
    B,
    /// Unexpected UA in states Connected or TimerRecovery
    C,
    /// UA received without F=1 when SABM or DISC was sent P=1
    D,
    /// DM received in states Connected or TimerRecovery
    E,
    /// Data link reset, SABM received in state Connected or TimerRecovery
    F,
    /// Too many retries establishing or releasing the link
    G,
    /// Too many retries during information transfer
    I,
    /// N(R) received is not valid
    J,
    /// Control field invalid or not implemented
    L,
    /// Information field received in a U or S frame
    M,
    /// Length of frame incorrect for frame type
    N,
    /// I frame exceeded maximum allowed length
    O,
    /// N(S) out of the window
    P,
    /// UI response received, or UI command with P=1 received
    Q,
    /// UI frame exceeded maximum allowed length
    R,
    /// I response received
    S,
    /// N2 timeouts: unacknowledged data
    T,
    /// N2 timeouts: extended peer busy condition
    U,
    /// No DL machines available to establish connection
    V,
    /// FRMR received
    K,
    /// The I-frame queue of the channel is full, data was dropped
    QueueFull,
}

impl fmt::Display for DlErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The peer established a link (SABM accepted)
#[derive(Debug)]
pub struct DlConnectInd {
    pub channel: ChannelId,
    pub callsign: Callsign,
}

/// A link we (re)established was confirmed by the peer
#[derive(Debug)]
pub struct DlConnectConf {
    pub channel: ChannelId,
    pub callsign: Callsign,
}

/// The link is gone, released by the peer or by a failure
#[derive(Debug)]
pub struct DlDisconnectInd {
    pub channel: ChannelId,
    pub callsign: Callsign,
}

/// A release we asked for has completed
#[derive(Debug)]
pub struct DlDisconnectConf {
    pub channel: ChannelId,
    pub callsign: Callsign,
}

/// In-sequence information received on the link
#[derive(Debug)]
pub struct DlDataInd {
    pub channel: ChannelId,
    pub callsign: Callsign,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct DlErrorInd {
    pub channel: ChannelId,
    pub callsign: Callsign,
    pub code: DlErrorCode,
}

/// Information to send on the link of `channel`
#[derive(Debug)]
pub struct DlDataReq {
    pub channel: ChannelId,
    pub data: Vec<u8>,
}

/// Release the link of `channel`
#[derive(Debug)]
pub struct DlDisconnectReq {
    pub channel: ChannelId,
}
