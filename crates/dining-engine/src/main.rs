//! Dining table binary.
//!
//! Seats N actors (five by default) around a ring and lets them think, get
//! hungry, and eat forever. Every phase change is narrated on stdout as
//! `<index> <event>[ for <duration>ms]`; diagnostics go to stderr through
//! `tracing`.
//!
//! # Startup Sequence
//!
//! 1. Load `dining-config.yaml` (or defaults) and apply env overrides
//! 2. Initialize structured logging (tracing)
//! 3. Build the table from the config
//! 4. Install the Ctrl-C handler that clears the table
//! 5. Run until stopped (never, unless a run bound is configured)
//! 6. Log the summary

mod error;

use std::path::Path;
use std::sync::Arc;

use dining_core::config::{LogFormat, LoggingConfig};
use dining_core::runner;
use dining_core::{DiningTable, StdoutNarrator, TableConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "dining-config.yaml";

/// Application entry point for the dining engine.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, or the run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = Path::new(CONFIG_FILE);
    let config = load_config(config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    if !config_path.exists() {
        info!("Config file not found, using defaults");
    }
    info!(
        actors = config.table.actors,
        policy = %config.table.policy,
        think_ms = ?(config.durations.think_min_ms, config.durations.think_max_ms),
        eat_ms = ?(config.durations.eat_min_ms, config.durations.eat_max_ms),
        seed = ?config.durations.seed,
        max_real_time_seconds = config.simulation.max_real_time_seconds,
        "Configuration loaded"
    );

    // 3. Build the table.
    println!("Dining Philosophers Problem");
    let table =
        DiningTable::from_config(&config, Arc::new(StdoutNarrator)).map_err(EngineError::from)?;

    // 4. Ctrl-C clears the table instead of killing it mid-meal.
    let control = Arc::clone(table.control());
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, clearing the table");
                control.request_stop();
            }
            Err(e) => warn!(error = %e, "failed to listen for interrupt"),
        }
    });

    // 5. Run.
    let result = table.run().await.map_err(EngineError::from)?;

    // 6. Log results.
    runner::log_table_end(&result);
    info!("dining-engine shutdown complete");

    Ok(())
}

/// Load the table configuration from `path`, falling back to defaults.
fn load_config(path: &Path) -> Result<TableConfig, EngineError> {
    Ok(TableConfig::load_or_default(path)?)
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: format!("{e}"),
    })
}
