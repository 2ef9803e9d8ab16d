pub(crate) mod executor;
pub(crate) mod job;
pub(crate) mod orchestrator;
pub(crate) mod queue;
pub(crate) mod report;
pub(crate) mod scanner;
#[cfg(test)]
pub(crate) mod testing;
mod worker;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{AppConfig, Credentials, RestoreConfig};
use crate::errors::AppError;
use crate::utils::setting::check_db_connection;
use executor::{MysqlShellExecutor, RestoreExecutor};
use orchestrator::{Orchestrator, WorkerCount};
use report::{RunClock, RunReport};

/// Public entry point for the restore process.
///
/// Validates the worker count, optionally checks that the target server accepts
/// connections, then scans, restores and writes the run report if configured.
/// Elapsed time in the report is measured from `clock`.
pub async fn run_restore_flow(
    app_config: &AppConfig,
    cancel: CancellationToken,
    clock: RunClock,
) -> Result<RunReport> {
    let restore_config = &app_config.restore;

    // Fail on a bad thread count before touching the server.
    let workers = WorkerCount::try_from(restore_config.restore_threads).map_err(AppError::from)?;

    if restore_config.preflight_check {
        check_db_connection(&app_config.credentials)
            .await
            .context("Cannot proceed with restore")?;
    }

    let executor = MysqlShellExecutor::locate(restore_config.mysqlsh_path.as_deref())?;
    info!("Using MySQL Shell at {}", executor.program().display());

    let report = run_with_executor(
        restore_config,
        workers,
        app_config.credentials.clone(),
        Arc::new(executor),
        cancel,
        clock,
    )
    .await?;

    info!(
        "Restored {} schemas, {} failed after repair, {} interrupted, {} not attempted, {} not repaired.",
        report.succeeded(),
        report.terminal_failure_count(),
        report.interrupted.len(),
        report.not_attempted.len(),
        report.repair_skipped.len()
    );

    if let Some(report_file) = &restore_config.report_file {
        report.write_json(report_file)?;
        info!("Run report written to {}", report_file.display());
    }

    Ok(report)
}

/// Scans and runs both restore phases with the given executor.
pub async fn run_with_executor<E: RestoreExecutor>(
    restore_config: &RestoreConfig,
    workers: WorkerCount,
    credentials: Credentials,
    executor: Arc<E>,
    cancel: CancellationToken,
    clock: RunClock,
) -> std::result::Result<RunReport, AppError> {
    let jobs = scanner::scan_dump_directories(
        &restore_config.dump_directories,
        restore_config.on_scan_error,
    )?;

    let mut orchestrator = Orchestrator::new(
        executor,
        credentials,
        restore_config.options.clone(),
        workers,
        cancel,
        clock,
    );
    Ok(orchestrator.run(jobs).await)
}

/// Scans the dump directories and logs the `source -> target` mapping without restoring.
pub fn log_restore_plan(restore_config: &RestoreConfig) -> std::result::Result<usize, AppError> {
    let workers = WorkerCount::try_from(restore_config.restore_threads)?;
    let jobs = scanner::scan_dump_directories(
        &restore_config.dump_directories,
        restore_config.on_scan_error,
    )?
    .drain();

    for job in &jobs {
        info!(
            "Planned restore: {} -> {}",
            job.source_path().display(),
            job.target_schema(&restore_config.options)
        );
    }
    info!(
        "Dry run: {} dump directories would be restored with {} workers.",
        jobs.len(),
        workers.get()
    );
    Ok(jobs.len())
}
