use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use log::{error, info};
use tokio::sync::broadcast;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use recordkeeper::{load_config, Config, Database, EngineSettings, LifecycleEngine, SweepScheduler};

/// Runs the record retention sweeps against a recordkeeper database.
#[derive(Debug, Parser)]
#[command(name = "recordkeeper-sweep", version)]
struct Args {
    /// Run one sweep and exit.
    #[arg(long)]
    once: bool,

    /// Path to a JSON config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_logging(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .json()
                .with_timer(SystemTime)
                .with_writer(std::io::stderr)
                .with_target(true),
        );
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::registry().with(env_filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        );
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if let Err(e) = init_logging(config.logging.json) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting recordkeeper-sweep v{}", env!("CARGO_PKG_VERSION"));

    let Some(db_path) = config.resolved_database_path() else {
        error!("Could not determine database path; set database_path in the config");
        return ExitCode::FAILURE;
    };
    let db = match Database::open(&db_path) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database at {}: {}", db_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let engine = Arc::new(LifecycleEngine::new(db, EngineSettings::from(&config)));

    if args.once {
        return match engine.run_sweep(Local::now().date_naive()) {
            Ok(report) => {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("Failed to serialize sweep report: {}", e),
                }
                if report.failed.is_empty() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                error!("Sweep failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let scheduler = Arc::new(
        SweepScheduler::new(engine, Duration::from_secs(config.sweep.interval_secs))
            .with_run_on_start(config.sweep.run_on_start),
    );
    let (trigger_tx, trigger_rx) = broadcast::channel(16);
    let handle = scheduler.start(trigger_rx);

    let ctrlc_scheduler = Arc::clone(&scheduler);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutdown requested");
        ctrlc_scheduler.stop();
        // Wake the select loop so it sees the shutdown
        let _ = trigger_tx.send(());
    }) {
        error!("Failed to install Ctrl-C handler: {}", e);
        scheduler.stop();
    }

    info!(
        "Sweeping every {}s (schedule disposals: {})",
        config.sweep.interval_secs, config.sweep.schedule_disposals
    );

    if handle.join().is_err() {
        error!("Sweep scheduler thread panicked");
        return ExitCode::FAILURE;
    }

    info!("recordkeeper-sweep stopped");
    ExitCode::SUCCESS
}
