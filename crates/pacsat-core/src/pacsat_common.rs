
// SAPs between the entities of the stack
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Sap {
    /// Radio/Classifier and Classifier/DataLink,Pb. Raw and decoded link frames
    LmSap,

    /// DataLink/Uplink. Connection-oriented data link service
    DlSap,
}

/// Index of an independently addressable radio receive path, starting at 0
pub type ChannelId = u8;

/// Upper bound on the number of radio channels
pub const MAX_CHANNELS: usize = 4;

const CHANNEL_NAMES: [char; MAX_CHANNELS] = ['A', 'B', 'C', 'D'];

/// Returns the letter used for a channel in status beacons and logs
pub fn channel_name(channel: ChannelId) -> char {
    CHANNEL_NAMES.get(channel as usize).copied().unwrap_or('?')
}
