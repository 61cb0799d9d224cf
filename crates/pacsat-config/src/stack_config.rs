use serde::Deserialize;
use std::sync::{Arc, RwLock};
use pacsat_core::{Callsign, MAX_CHANNELS};

/// The radio I/O backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RadioBackend {
    /// No radio attached. Frames are only exchanged through the message router (tests)
    None,
    /// KISS-framed TNC reachable over TCP
    KissTcp,
}

/// Where file bodies are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StorageBackend {
    Memory,
    Fs,
}

/// Station addresses the server answers to
#[derive(Debug, Clone)]
pub struct CfgIdentity {
    /// Connected-mode (FTL0 upload) address
    pub bbs: Callsign,
    /// Broadcast (PB) address
    pub broadcast: Callsign,
    /// Digipeater address
    pub digi: Callsign,
}

impl Default for CfgIdentity {
    fn default() -> Self {
        Self {
            bbs: Callsign::well_known("PACSAT", 12),
            broadcast: Callsign::well_known("PACSAT", 11),
            digi: Callsign::well_known("PACSAT", 1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgRadio {
    pub backend: RadioBackend,
    /// For KissTcp backend: TNC host and port
    pub host: String,
    pub port: u16,
    /// Number of independent receive channels, 1 to 4
    pub num_channels: u8,
    /// Bounded transmit queue towards the TNC, in frames
    pub tx_queue_len: usize,
    /// Bounded receive queue from the TNC, in frames
    pub rx_queue_len: usize,
}

impl Default for CfgRadio {
    fn default() -> Self {
        Self {
            backend: RadioBackend::None,
            host: "127.0.0.1".to_string(),
            port: 8001,
            num_channels: 4,
            tx_queue_len: 5,
            rx_queue_len: 32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgDataLink {
    /// Acknowledgement timer T1
    pub t1_secs: u64,
    /// Idle probe timer T3
    pub t3_secs: u64,
    /// Maximum retries N2
    pub n2_retries: u8,
    /// Maximum outstanding I frames k, at most 7
    pub window_k: u8,
    /// Bounded I-frame queue per channel
    pub iframe_queue_len: usize,
    /// Period of the "Open ABCD." uplink status beacon
    pub status_period_secs: u64,
}

impl Default for CfgDataLink {
    fn default() -> Self {
        Self {
            t1_secs: 3,
            t3_secs: 30,
            n2_retries: 10,
            window_k: 4,
            iframe_queue_len: 10,
            status_period_secs: 40,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgUplink {
    /// Largest file accepted by UPLOAD_CMD
    pub max_file_size: u32,
    /// Bytes of free space kept back on top of the declared upload length
    pub space_margin: u64,
    /// Upload records older than this are purged, with their temporary files
    pub max_upload_age_secs: u64,
    /// Capacity of the upload (continuation) table
    pub max_upload_records: usize,
    /// Period of the maintenance sweep
    pub maintenance_period_secs: u64,
}

impl Default for CfgUplink {
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024,
            space_margin: 1280,
            max_upload_age_secs: 3 * 60 * 60,
            max_upload_records: 25,
            maintenance_period_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgBroadcast {
    /// Capacity of the broadcast queue
    pub max_entries: usize,
    /// An entry is dropped this many seconds after its request
    pub max_age_secs: u64,
    /// Period of the PB status beacon
    pub status_period_secs: u64,
    /// One broadcast frame is sent every this many ticks
    pub service_ticks: u64,
}

impl Default for CfgBroadcast {
    fn default() -> Self {
        Self {
            max_entries: 10,
            max_age_secs: 600,
            status_period_secs: 30,
            service_ticks: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgStorage {
    pub backend: StorageBackend,
    /// For Fs backend: directory holding the files
    pub path: Option<String>,
    /// Total bytes the store may hold
    pub capacity_bytes: u64,
    /// Directory entries older than this are expired
    pub max_file_age_secs: u64,
}

impl Default for CfgStorage {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            capacity_bytes: 16 * 1024 * 1024,
            max_file_age_secs: 5 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StackConfig {
    pub debug_log: Option<String>,

    /// Identity is REQUIRED in the config file, defaults exist for tests only
    pub identity: CfgIdentity,
    pub radio: CfgRadio,
    pub datalink: CfgDataLink,
    pub uplink: CfgUplink,
    pub broadcast: CfgBroadcast,
    pub storage: CfgStorage,
}

impl StackConfig {
    pub fn new(identity: CfgIdentity) -> Self {
        StackConfig {
            debug_log: None,
            identity,
            radio: CfgRadio::default(),
            datalink: CfgDataLink::default(),
            uplink: CfgUplink::default(),
            broadcast: CfgBroadcast::default(),
            storage: CfgStorage::default(),
        }
    }

    /// Validate that all required configuration fields are properly set.
    pub fn validate(&self) -> Result<(), &str> {
        if self.identity.bbs == self.identity.broadcast {
            return Err("identity.bbs and identity.broadcast must differ");
        }

        if self.radio.num_channels == 0 || self.radio.num_channels as usize > MAX_CHANNELS {
            return Err("radio.num_channels must be 1 to 4");
        }
        if self.radio.tx_queue_len == 0 || self.radio.rx_queue_len == 0 {
            return Err("radio queue lengths must be nonzero");
        }
        match self.radio.backend {
            RadioBackend::KissTcp => {
                if self.radio.host.is_empty() {
                    return Err("radio.host must be provided for KissTcp backend");
                }
            }
            RadioBackend::None => {} // For testing
        }

        if self.datalink.t1_secs == 0 || self.datalink.t3_secs == 0 {
            return Err("datalink timers must be nonzero");
        }
        if self.datalink.n2_retries == 0 {
            return Err("datalink.n2_retries must be nonzero");
        }
        if self.datalink.window_k == 0 || self.datalink.window_k > 7 {
            return Err("datalink.window_k must be 1 to 7");
        }
        if self.datalink.iframe_queue_len == 0 {
            return Err("datalink.iframe_queue_len must be nonzero");
        }

        if self.uplink.max_upload_records == 0 {
            return Err("uplink.max_upload_records must be nonzero");
        }
        if self.broadcast.max_entries == 0 {
            return Err("broadcast.max_entries must be nonzero");
        }
        if self.broadcast.service_ticks == 0 {
            return Err("broadcast.service_ticks must be nonzero");
        }

        if self.storage.backend == StorageBackend::Fs && self.storage.path.is_none() {
            return Err("storage.path must be provided for Fs backend");
        }

        Ok(())
    }
}

/// Mutable, stack-editable state (mutex-protected).
#[derive(Debug, Clone)]
pub struct StackState {
    /// New FTL0 logins are accepted
    pub uplink_enabled: bool,
    /// New PB requests are accepted
    pub pb_enabled: bool,
}

impl Default for StackState {
    fn default() -> Self {
        Self {
            uplink_enabled: true,
            pb_enabled: true,
        }
    }
}

/// Global shared configuration: immutable config + mutable state.
#[derive(Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<StackConfig>,
    /// Mutable state guarded with RwLock (write by the stack, read by others).
    state: Arc<RwLock<StackState>>,
}

impl SharedConfig {
    pub fn new(identity: CfgIdentity) -> Self {
        Self::from_config(StackConfig::new(identity))
    }

    pub fn from_config(cfg: StackConfig) -> Self {
        Self::from_parts(cfg, StackState::default())
    }

    pub fn from_parts(cfg: StackConfig, state: StackState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid stack configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<StackConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, StackState> {
        self.state.read().expect("StackState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, StackState> {
        self.state.write().expect("StackState RwLock blocked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = StackConfig::new(CfgIdentity::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let mut cfg = StackConfig::new(CfgIdentity::default());
        cfg.radio.num_channels = 5;
        assert!(cfg.validate().is_err());

        let mut cfg = StackConfig::new(CfgIdentity::default());
        cfg.storage.backend = StorageBackend::Fs;
        assert!(cfg.validate().is_err());

        let mut cfg = StackConfig::new(CfgIdentity::default());
        cfg.identity.broadcast = cfg.identity.bbs.clone();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_state_toggle() {
        let shared = SharedConfig::new(CfgIdentity::default());
        assert!(shared.state_read().pb_enabled);
        shared.state_write().pb_enabled = false;
        let other = shared.clone();
        assert!(!other.state_read().pb_enabled);
    }
}
