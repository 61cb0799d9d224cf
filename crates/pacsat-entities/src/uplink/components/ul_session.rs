use pacsat_core::{Callsign, ChannelId, FileId, UnixTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UlState {
    /// No station logged in
    Uninit,
    /// Logged in, waiting for UPLOAD_CMD
    CmdOk,
    /// Receiving DATA for `file_id`
    DataRx,
    /// Waiting for the link to go down, data is ignored
    Abort,
}

/// FTL0 state of the station on one channel
#[derive(Debug)]
pub struct UlSession {
    pub channel: ChannelId,
    pub state: UlState,
    pub callsign: Option<Callsign>,
    /// File being written, 0 until UPLOAD_CMD is accepted
    pub file_id: FileId,
    pub offset: u32,
    pub length: u32,
    /// Login time
    pub request_time: UnixTime,
}

impl UlSession {
    pub fn new(channel: ChannelId) -> Self {
        Self { channel, state: UlState::Uninit, callsign: None, file_id: 0, offset: 0, length: 0, request_time: 0 }
    }

    pub fn is_active(&self) -> bool {
        self.state != UlState::Uninit
    }

    pub fn login(&mut self, callsign: Callsign, now: UnixTime) {
        self.state = UlState::CmdOk;
        self.callsign = Some(callsign);
        self.file_id = 0;
        self.offset = 0;
        self.length = 0;
        self.request_time = now;
    }

    /// Back to CmdOk without an open file
    pub fn reset_transfer(&mut self) {
        self.state = UlState::CmdOk;
        self.file_id = 0;
        self.offset = 0;
        self.length = 0;
    }

    pub fn evict(&mut self, now: UnixTime) {
        if let Some(callsign) = &self.callsign {
            tracing::info!(
                ch = self.channel,
                "{} off the uplink after {} s",
                callsign,
                now.saturating_sub(self.request_time)
            );
        }
        *self = Self::new(self.channel);
    }
}
