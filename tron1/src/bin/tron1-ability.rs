//! Ability host: loads abilities from a system config, starts the autostart
//! ones, serves the remote CLI and stops everything on Ctrl+C.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use tron1::cli::AbilityCli;
use tron1_ability::{AbilityManager, AbilityRegistry, RemoteCliServer, RobotData, SystemConfig};
use tron1_core::config::PathsConfig;
use tron1_core::observability;
use tron1_core::robot::{RobotApi, SimRobot};

const DEFAULT_CONFIG: &str = "abilities.yaml";

fn main() -> anyhow::Result<()> {
    observability::init_tracing();
    let cli = AbilityCli::parse();

    let config_path = cli
        .config
        .or_else(|| PathsConfig::from_env().ability_config.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = SystemConfig::load(&config_path)?;
    tracing::info!(
        config = %config_path.display(),
        robot_type = %config.robot_type,
        robot_ip = %config.robot_ip,
        abilities = config.ability_count(),
        "Loaded system config"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, stopping abilities...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    tracing::warn!("No vendor SDK binding linked; driving the simulated robot");
    let api: Arc<dyn RobotApi> = Arc::new(SimRobot::new(config.robot_type.motor_number()));
    let robot = Arc::new(RobotData::connect(api, &config.robot_ip)?);

    let manager = Arc::new(AbilityManager::new(AbilityRegistry::with_builtins(), robot));
    let loaded = manager.load_from_config(&config);
    tracing::info!("Loaded {}/{} abilities", loaded, config.ability_count());

    let server = if cli.no_remote_cli {
        None
    } else {
        let server = RemoteCliServer::new(config.remote_cli_port, Arc::clone(&manager));
        let addr = server
            .start()
            .with_context(|| format!("Failed to start remote CLI on port {}", config.remote_cli_port))?;
        tracing::info!("Remote CLI listening on {}", addr);
        Some(server)
    };

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    if let Some(server) = server {
        server.stop();
    }
    manager.stop_all();
    tracing::info!("Ability host stopped");
    Ok(())
}
