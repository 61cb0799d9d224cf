
// Entities of the ground-link stack
#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum PacsatEntity {
    /// Edge to the TNC / radio hardware
    Radio,
    /// Decodes received frames and routes them by destination address
    Classifier,
    /// Per-channel AX.25 connected-mode link state machines
    DataLink,
    /// FTL0 upload server, one session per channel
    Uplink,
    /// PACSAT broadcast queue (directory and file downloads)
    Pb,
}
