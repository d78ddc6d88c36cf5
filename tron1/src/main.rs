use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use tron1::cli::{default_model_dir, Cli};
use tron1::{launch, LaunchError, LaunchSettings};
use tron1_core::config::{LaunchEnv, PathsConfig};
use tron1_core::observability;
use tron1_core::robot::SimRobot;

fn main() -> ExitCode {
    observability::init_tracing();
    let cli = Cli::parse();

    let env = LaunchEnv::from_env();
    let model_dir = cli
        .model_dir
        .or_else(|| PathsConfig::from_env().model_dir.map(PathBuf::from))
        .unwrap_or_else(default_model_dir);
    let settings = match LaunchSettings::resolve(&env, cli.robot_ip, model_dir) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<LaunchError>() {
            Some(launch_err @ LaunchError::RobotInit(_)) => {
                tracing::error!("{}", launch_err);
                ExitCode::from(launch_err.exit_code() as u8)
            }
            Some(launch_err) => fail(launch_err),
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(settings: &LaunchSettings) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, stopping controller...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    tracing::warn!("No vendor SDK binding linked; driving the simulated robot");
    let robot = Arc::new(SimRobot::new(settings.family.joint_count() as u32));
    launch(settings, robot, &shutdown)?;
    Ok(())
}

fn fail(e: &LaunchError) -> ExitCode {
    eprintln!("Error: {}", e);
    ExitCode::from(e.exit_code() as u8)
}
