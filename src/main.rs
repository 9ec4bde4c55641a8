use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use hotspot_bringup::{
    config::AppConfig,
    services::bringup::BringupSequencer,
    sim::{SimRig, SimUplinkProfile},
    storage_client::FsKvStore,
};
use log::{debug, error, info};
use std::io::Write;
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize();

    let config = AppConfig::load().context("failed to load configuration")?;
    let profile = SimUplinkProfile::from_env().context("failed to load uplink profile")?;

    // simulated modem, radio, dhcp and nat; the key-value store is the
    // one collaborator backed by the real filesystem
    let rig = SimRig::new(profile);
    let store = FsKvStore::new(&config.storage);

    let mut sequencer =
        BringupSequencer::new(config, rig.modem, rig.wifi, rig.dhcp, rig.nat, store);

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let result = tokio::select! {
        result = sequencer.run() => result.context("bring-up failed"),
        _ = tokio::signal::ctrl_c() => {
            debug!("ctrl-c received");
            Ok(())
        },
        _ = sigterm.recv() => {
            debug!("SIGTERM received");
            Ok(())
        },
    };

    if let Err(e) = sequencer.shutdown().await {
        error!("failed to release the modem: {e:#}");
    }
    info!("shutdown complete");

    result
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => writeln!(f, "{}", record.args()),
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));
}
