mod activity;
mod camera;
mod config;
mod controller;
mod journal;
mod schedule;
mod sky;
mod utils;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::activity::{ActivityOracle, FeedClient, FetchError, IndexSource};
use crate::camera::RpicamStill;
use crate::config::{Config, ConfigError};
use crate::controller::{CapturePlan, Controller, ControllerState};
use crate::journal::{init_logging, Event, Journal, LogJournal};
use crate::schedule::{next_slot, SystemTimer, Timer};
use crate::sky::{next_sunrise, next_sunset, DarknessOracle};

#[derive(Parser)]
#[command(name = "aurora-cam")]
#[command(about = "Long-exposure aurora camera: shoots when it is dark and Kp is high")]
struct Cli {
    /// YAML config file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Poll and capture until stopped (the default)
    Run,
    /// Validate the config and print the effective settings
    Validate,
    /// Evaluate darkness and activity once, without capturing
    Status,
    /// Take one photo now, ignoring darkness and activity
    Snap,
}

#[derive(Debug, Error)]
enum SetupError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("activity feed: {0}")]
    Feed(#[from] FetchError),
    #[error("log file: {0}")]
    Logging(#[from] io::Error),
}

type AuroraCam = Controller<SystemTimer, FeedClient, RpicamStill<LogJournal>, LogJournal>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await,
        Commands::Validate => validate(&config),
        Commands::Status => status(&config).await,
        Commands::Snap => snap(&config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn build(config: &Config) -> Result<AuroraCam, SetupError> {
    let darkness = DarknessOracle::new(config.station.station()?, config.station.horizon_deg);
    let client = FeedClient::new(
        config.activity.url.clone(),
        config.activity.format.clone(),
        config.activity.timeout,
    )?;
    let camera = RpicamStill::new(
        config.camera.program.clone(),
        config.camera.lock_path.clone(),
        LogJournal,
    );

    Ok(Controller::new(
        SystemTimer,
        darkness,
        ActivityOracle::new(client, config.activity.threshold),
        camera,
        LogJournal,
        CapturePlan::from_config(config),
    ))
}

async fn run(config: &Config) -> ExitCode {
    let mut cam = match init_logging(config.log.file.as_deref())
        .map_err(SetupError::from)
        .and_then(|()| build(config))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = tokio::select! {
        result = cam.run() => result,
        _ = tokio::signal::ctrl_c() => {
            if cam.state() == ControllerState::Capturing {
                log::warn!("Interrupted during a capture");
            }
            LogJournal.record(Event::Stopping);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal: {}", e);
            eprintln!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(config: &Config) -> ExitCode {
    let station = match config.station.station() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let camera = &config.camera;
    let settings = &camera.settings;

    println!("Config is valid");
    println!(
        "  station: {} ({}, {}), horizon {} deg",
        config.station.name.as_deref().unwrap_or("unnamed"),
        station.latitude_deg,
        station.longitude_deg,
        config.station.horizon_deg
    );
    println!(
        "  activity: {} > {} (timeout {})",
        config.activity.url,
        config.activity.threshold,
        humantime::format_duration(config.activity.timeout)
    );
    println!(
        "  camera: {} {}x{} @ {} fps, shutter {} us, ISO {}, exposure {}, warm-up {}",
        camera.program.display(),
        settings.resolution.width,
        settings.resolution.height,
        settings.framerate,
        settings.shutter_us,
        settings.iso,
        settings.exposure_mode,
        humantime::format_duration(settings.warm_up)
    );
    println!(
        "  output: {}, annotated {} in {} at {} px",
        camera.output.path_for(&Local::now()).display(),
        camera.annotation.format,
        camera.annotation.colour,
        camera.annotation.size
    );
    println!(
        "  every {}, on capture failure: {:?}",
        humantime::format_duration(config.schedule.interval),
        camera.on_fail
    );
    ExitCode::SUCCESS
}

async fn status(config: &Config) -> ExitCode {
    if let Err(e) = init_logging(None) {
        eprintln!("Startup error: {}", e);
        return ExitCode::FAILURE;
    }
    let station = match config.station.station() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let horizon = config.station.horizon_deg;
    let now = SystemTimer.now();

    let dark = match DarknessOracle::new(station, horizon).is_dark(now, &LogJournal) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Solar error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Now: {}", now.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    println!("Dark: {}", dark);
    for (label, event) in [
        ("Next sunrise", next_sunrise(&station, now, horizon)),
        ("Next sunset", next_sunset(&station, now, horizon)),
    ] {
        match event {
            Ok(t) => println!("{}: {}", label, t.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
            Err(e) => println!("{}: {}", label, e),
        }
    }

    let client = match FeedClient::new(
        config.activity.url.clone(),
        config.activity.format.clone(),
        config.activity.timeout,
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Activity feed error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let high = match client.fetch_index().await {
        Ok(value) => {
            let high = value > config.activity.threshold;
            println!(
                "Activity index: {} ({})",
                value,
                if high { "high" } else { "quiet" }
            );
            high
        }
        Err(e) => {
            println!("Activity index unavailable from {}: {}", client.url(), e);
            false
        }
    };

    println!("Would capture: {}", dark && high);
    println!(
        "Next slot: {}",
        next_slot(now, config.schedule.interval)
            .with_timezone(&Local)
            .format("%H:%M:%S")
    );
    ExitCode::SUCCESS
}

async fn snap(config: &Config) -> ExitCode {
    let mut cam = match init_logging(config.log.file.as_deref())
        .map_err(SetupError::from)
        .and_then(|()| build(config))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cam.capture().await {
        Ok(path) => {
            println!("Captured {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Capture failed: {}", e);
            eprintln!("Capture failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
