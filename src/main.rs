//! MySQL Dump Restore Tool
//!
//! Restores every dump directory found under the configured roots into the
//! target server under a prefixed schema name, retrying failed restores once.

// restoretool/src/main.rs
mod config;
mod errors;
mod logging;
mod restore;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use restore::report::RunClock;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Bulk restore of MySQL Shell dump directories with a schema-name prefix.
#[derive(Parser, Debug)]
#[command(name = "restoretool", version, about)]
struct Args {
    /// Path to the YAML configuration file. Defaults to `conf/config.yaml`
    /// next to the executable.
    #[arg(long, short, env = "RESTORETOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Scan the dump directories and log the planned restores without running them.
    #[arg(long)]
    dry_run: bool,
}

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run_app(args).await {
        Ok(true) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("❌ Restore finished with failed or skipped schemas. See the log for details.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every discovered dump was restored.
async fn run_app(args: Args) -> Result<bool> {
    let clock = RunClock::start();
    dotenv::dotenv().ok();

    let config_path = match args.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    println!("Start reading configuration file {}...", config_path.display());
    let app_config = AppConfig::load_from_yaml(&config_path).with_context(|| {
        format!(
            "Failed to load application configuration from {}",
            config_path.display()
        )
    })?;
    println!("Complete reading configuration file.");

    logging::init(&app_config.logging.log_file_path())?;

    if args.dry_run {
        restore::log_restore_plan(&app_config.restore).context("Dry run failed")?;
        return Ok(true);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received. Cancelling the restore run…");
                cancel.cancel();
            }
        }
    });

    let report = restore::run_restore_flow(&app_config, cancel, clock)
        .await
        .context("Restore process failed")?;

    Ok(report.is_success())
}
