use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use pacsat_core::Callsign;
use serde::Deserialize;
use toml::Value;

use super::stack_config::{
    CfgBroadcast, CfgDataLink, CfgIdentity, CfgRadio, CfgStorage, CfgUplink, RadioBackend, SharedConfig, StackConfig,
    StackState, StorageBackend,
};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.1";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if !root.identity.extra.is_empty() {
        return Err(format!("Unrecognized fields in identity: {:?}", sorted_keys(&root.identity.extra)).into());
    }
    if let Some(ref radio) = root.radio {
        if !radio.extra.is_empty() {
            return Err(format!("Unrecognized fields in radio: {:?}", sorted_keys(&radio.extra)).into());
        }
    }
    if let Some(ref dl) = root.datalink {
        if !dl.extra.is_empty() {
            return Err(format!("Unrecognized fields in datalink: {:?}", sorted_keys(&dl.extra)).into());
        }
    }
    if let Some(ref ul) = root.uplink {
        if !ul.extra.is_empty() {
            return Err(format!("Unrecognized fields in uplink: {:?}", sorted_keys(&ul.extra)).into());
        }
    }
    if let Some(ref pb) = root.broadcast {
        if !pb.extra.is_empty() {
            return Err(format!("Unrecognized fields in broadcast: {:?}", sorted_keys(&pb.extra)).into());
        }
    }
    if let Some(ref st) = root.storage {
        if !st.extra.is_empty() {
            return Err(format!("Unrecognized fields in storage: {:?}", sorted_keys(&st.extra)).into());
        }
    }
    if let Some(ref ss) = root.stack_state {
        if !ss.extra.is_empty() {
            return Err(format!("Unrecognized fields in stack_state: {:?}", sorted_keys(&ss.extra)).into());
        }
    }

    // Build config from required and optional values
    let defaults = CfgIdentity::default();
    let mut cfg = StackConfig::new(CfgIdentity {
        bbs: root.identity.bbs,
        broadcast: root.identity.broadcast,
        digi: root.identity.digi.unwrap_or(defaults.digi),
    });
    cfg.debug_log = root.debug_log;

    if let Some(radio) = root.radio {
        apply_radio_patch(&mut cfg.radio, radio);
    }
    if let Some(dl) = root.datalink {
        apply_datalink_patch(&mut cfg.datalink, dl);
    }
    if let Some(ul) = root.uplink {
        apply_uplink_patch(&mut cfg.uplink, ul);
    }
    if let Some(pb) = root.broadcast {
        apply_broadcast_patch(&mut cfg.broadcast, pb);
    }
    if let Some(st) = root.storage {
        apply_storage_patch(&mut cfg.storage, st);
    }

    // Validate here so a bad file is reported instead of panicking in from_parts
    cfg.validate().map_err(|e| e.to_string())?;

    // Initial administrative state
    let mut state = StackState::default();
    if let Some(ss) = root.stack_state {
        if let Some(v) = ss.uplink_enabled {
            state.uplink_enabled = v;
        }
        if let Some(v) = ss.pb_enabled {
            state.pb_enabled = v;
        }
    }

    Ok(SharedConfig::from_parts(cfg, state))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_radio_patch(dst: &mut CfgRadio, src: RadioDto) {
    dst.backend = src.backend;
    if let Some(v) = src.host {
        dst.host = v;
    }
    if let Some(v) = src.port {
        dst.port = v;
    }
    if let Some(v) = src.num_channels {
        dst.num_channels = v;
    }
    if let Some(v) = src.tx_queue_len {
        dst.tx_queue_len = v;
    }
    if let Some(v) = src.rx_queue_len {
        dst.rx_queue_len = v;
    }
}

fn apply_datalink_patch(dst: &mut CfgDataLink, src: DataLinkDto) {
    if let Some(v) = src.t1_secs {
        dst.t1_secs = v;
    }
    if let Some(v) = src.t3_secs {
        dst.t3_secs = v;
    }
    if let Some(v) = src.n2_retries {
        dst.n2_retries = v;
    }
    if let Some(v) = src.window_k {
        dst.window_k = v;
    }
    if let Some(v) = src.iframe_queue_len {
        dst.iframe_queue_len = v;
    }
    if let Some(v) = src.status_period_secs {
        dst.status_period_secs = v;
    }
}

fn apply_uplink_patch(dst: &mut CfgUplink, src: UplinkDto) {
    if let Some(v) = src.max_file_size {
        dst.max_file_size = v;
    }
    if let Some(v) = src.space_margin {
        dst.space_margin = v;
    }
    if let Some(v) = src.max_upload_age_secs {
        dst.max_upload_age_secs = v;
    }
    if let Some(v) = src.max_upload_records {
        dst.max_upload_records = v;
    }
    if let Some(v) = src.maintenance_period_secs {
        dst.maintenance_period_secs = v;
    }
}

fn apply_broadcast_patch(dst: &mut CfgBroadcast, src: BroadcastDto) {
    if let Some(v) = src.max_entries {
        dst.max_entries = v;
    }
    if let Some(v) = src.max_age_secs {
        dst.max_age_secs = v;
    }
    if let Some(v) = src.status_period_secs {
        dst.status_period_secs = v;
    }
    if let Some(v) = src.service_ticks {
        dst.service_ticks = v;
    }
}

fn apply_storage_patch(dst: &mut CfgStorage, src: StorageDto) {
    dst.backend = src.backend;
    dst.path = src.path;
    if let Some(v) = src.capacity_bytes {
        dst.capacity_bytes = v;
    }
    if let Some(v) = src.max_file_age_secs {
        dst.max_file_age_secs = v;
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    identity: IdentityDto,

    #[serde(default)]
    radio: Option<RadioDto>,

    #[serde(default)]
    datalink: Option<DataLinkDto>,

    #[serde(default)]
    uplink: Option<UplinkDto>,

    #[serde(default)]
    broadcast: Option<BroadcastDto>,

    #[serde(default)]
    storage: Option<StorageDto>,

    #[serde(default)]
    stack_state: Option<StackStatePatch>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct IdentityDto {
    pub bbs: Callsign,
    pub broadcast: Callsign,
    pub digi: Option<Callsign>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RadioDto {
    pub backend: RadioBackend,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub num_channels: Option<u8>,
    pub tx_queue_len: Option<usize>,
    pub rx_queue_len: Option<usize>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct DataLinkDto {
    pub t1_secs: Option<u64>,
    pub t3_secs: Option<u64>,
    pub n2_retries: Option<u8>,
    pub window_k: Option<u8>,
    pub iframe_queue_len: Option<usize>,
    pub status_period_secs: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct UplinkDto {
    pub max_file_size: Option<u32>,
    pub space_margin: Option<u64>,
    pub max_upload_age_secs: Option<u64>,
    pub max_upload_records: Option<usize>,
    pub maintenance_period_secs: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct BroadcastDto {
    pub max_entries: Option<usize>,
    pub max_age_secs: Option<u64>,
    pub status_period_secs: Option<u64>,
    pub service_ticks: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct StorageDto {
    pub backend: StorageBackend,
    pub path: Option<String>,
    pub capacity_bytes: Option<u64>,
    pub max_file_age_secs: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct StackStatePatch {
    pub uplink_enabled: Option<bool>,
    pub pb_enabled: Option<bool>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
config_version = "0.1"

[identity]
bbs = "pacsat-12"
broadcast = "PACSAT-11"

[radio]
backend = "KissTcp"
host = "localhost"
port = 8100
num_channels = 2

[datalink]
t1_secs = 5

[broadcast]
max_entries = 4

[storage]
backend = "Fs"
path = "/var/lib/pacsat"

[stack_state]
pb_enabled = false
"#;

    #[test]
    fn test_parse_example() {
        let shared = from_toml_str(EXAMPLE).unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.identity.bbs.to_string(), "PACSAT-12");
        assert_eq!(cfg.identity.digi.to_string(), "PACSAT-1");
        assert_eq!(cfg.radio.backend, RadioBackend::KissTcp);
        assert_eq!(cfg.radio.num_channels, 2);
        assert_eq!(cfg.datalink.t1_secs, 5);
        assert_eq!(cfg.datalink.t3_secs, 30);
        assert_eq!(cfg.broadcast.max_entries, 4);
        assert_eq!(cfg.storage.path.as_deref(), Some("/var/lib/pacsat"));
        assert!(!shared.state_read().pb_enabled);
        assert!(shared.state_read().uplink_enabled);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let bad = EXAMPLE.replace("t1_secs = 5", "t1_secs = 5\nt9_secs = 1");
        let err = from_toml_str(&bad).err().unwrap();
        assert!(err.to_string().contains("t9_secs"));
    }

    #[test]
    fn test_rejects_wrong_version_and_bad_callsign() {
        let bad = EXAMPLE.replace("\"0.1\"", "\"0.5\"");
        assert!(from_toml_str(&bad).is_err());
        let bad = EXAMPLE.replace("pacsat-12", "PACSAT/12");
        assert!(from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let bad = EXAMPLE.replace("num_channels = 2", "num_channels = 9");
        assert!(from_toml_str(&bad).is_err());
    }
}
