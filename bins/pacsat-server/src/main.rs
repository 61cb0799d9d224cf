use clap::Parser;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pacsat_config::{SharedConfig, StorageBackend, toml_config};
use pacsat_core::{PacsatTime, UnixTime, debug};
use pacsat_entities::MessageRouter;
use pacsat_entities::dir::{Directory, FileStore, FsFileStore, MemFileStore, SharedDir};
use pacsat_entities::{
    classifier::classifier_bs::ClassifierBs, datalink::datalink_bs::DataLinkBs, pb::pb_bs::PbBs,
    radio::radio_entity::RadioEntity, uplink::uplink_bs::UplinkBs,
};

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

/// Wall clock in unix seconds
fn unix_now() -> UnixTime {
    UnixTime::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Opens the file store and reads the directory from it
fn open_directory(cfg: &SharedConfig, now: UnixTime) -> SharedDir {
    let storage = cfg.config().storage.clone();
    let store: Box<dyn FileStore> = match storage.backend {
        StorageBackend::Memory => Box::new(MemFileStore::new(storage.capacity_bytes)),
        StorageBackend::Fs => {
            let path = storage.path.clone().unwrap_or_else(|| ".".to_string());
            match FsFileStore::open(&path, storage.capacity_bytes) {
                Ok(store) => Box::new(store),
                Err(e) => {
                    println!("Failed to open file store at {}: {}", path, e);
                    std::process::exit(1);
                }
            }
        }
    };

    let mut dir = Directory::new(store);
    match dir.load(now) {
        Ok(n) => tracing::info!("Directory loaded, {} files", n),
        Err(e) => {
            println!("Failed to load directory: {}", e);
            std::process::exit(1);
        }
    }
    SharedDir::new(dir)
}

/// Start ground-link server stack
fn build_server_stack(cfg: &SharedConfig, dir: SharedDir, now: UnixTime) -> MessageRouter {
    let mut router = MessageRouter::new(cfg.clone());

    let radio = RadioEntity::new(cfg.clone());
    let classifier = ClassifierBs::new(cfg.clone());
    let datalink = DataLinkBs::new(cfg.clone());
    let uplink = UplinkBs::new(cfg.clone(), dir.clone());
    let pb = PbBs::new(cfg.clone(), dir);
    router.register_entity(Box::new(radio));
    router.register_entity(Box::new(classifier));
    router.register_entity(Box::new(datalink));
    router.register_entity(Box::new(uplink));
    router.register_entity(Box::new(pb));

    // Stack time follows the wall clock
    router.set_time(PacsatTime::new(now));
    router.set_realtime(true);

    router
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "PACSAT Ground-Link Server",
    long_about = "Runs the PACSAT FTL0 upload and broadcast server using the provided TOML configuration file"
)]

struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with station identity, TNC and storage parameters")]
    config: String,
}

fn main() {
    eprintln!("░█▀█░█▀█░█▀▀░█▀▀░█▀█░▀█▀░░░░░█▀▀░█▀▀░█▀▄░█░█░█▀▀░█▀▄");
    eprintln!("░█▀▀░█▀█░█░░░▀▀█░█▀█░░█░░▄▄▄░▀▀█░█▀▀░█▀▄░▀▄▀░█▀▀░█▀▄");
    eprintln!("░▀░░░▀░▀░▀▀▀░▀▀▀░▀░▀░░▀░░░░░░▀▀▀░▀▀▀░▀░▀░░▀░░▀▀▀░▀░▀\n");

    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let now = unix_now();
    let dir = open_directory(&cfg, now);
    let mut router = build_server_stack(&cfg, dir, now);
    eprintln!(
        " -> {} on {} channel(s), broadcasting as {}",
        cfg.config().identity.bbs,
        cfg.config().radio.num_channels,
        cfg.config().identity.broadcast
    );

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    router.run_stack(None, Some(running));
    // router drops here, RadioEntity::drop stops the TNC worker
}
