// restoretool/src/restore/orchestrator.rs
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::executor::RestoreExecutor;
use super::queue::JobQueue;
use super::report::{PhaseReport, RunClock, RunReport, RunState};
use super::worker::{Worker, WorkerMode};
use crate::config::{Credentials, RestoreOptions};
use crate::errors::ConfigError;

/// Number of concurrent restore workers per phase. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCount(NonZeroUsize);

impl WorkerCount {
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<i64> for WorkerCount {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(WorkerCount)
            .ok_or(ConfigError::InvalidThreadCount(value))
    }
}

/// Drives the primary and repair phases over a populated job queue.
pub struct Orchestrator<E> {
    executor: Arc<E>,
    credentials: Arc<Credentials>,
    options: Arc<RestoreOptions>,
    workers: WorkerCount,
    cancel: CancellationToken,
    clock: RunClock,
    state: RunState,
}

impl<E: RestoreExecutor> Orchestrator<E> {
    pub fn new(
        executor: Arc<E>,
        credentials: Credentials,
        options: RestoreOptions,
        workers: WorkerCount,
        cancel: CancellationToken,
        clock: RunClock,
    ) -> Self {
        Self {
            executor,
            credentials: Arc::new(credentials),
            options: Arc::new(options),
            workers,
            cancel,
            clock,
            state: RunState::Scanning,
        }
    }

    fn transition(&mut self, next: RunState) {
        info!(from = ?self.state, to = ?next, "Restore run state changed");
        self.state = next;
    }

    /// Runs both phases to completion and aggregates the worker reports.
    pub async fn run(&mut self, jobs: JobQueue) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("restore_run", run.id = %run_id);
        self.run_inner(run_id, jobs).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid, jobs: JobQueue) -> RunReport {
        let job_queue = Arc::new(jobs);
        let repair_queue = Arc::new(JobQueue::new());

        self.transition(RunState::PrimaryRestore);
        info!(
            "Starting restore of {} dump directories with {} workers.",
            job_queue.len(),
            self.workers.get()
        );
        let primary = self
            .run_phase(
                job_queue.clone(),
                WorkerMode::Primary {
                    repair_queue: repair_queue.clone(),
                },
            )
            .await;

        let mut repair = None;
        match RunState::after_primary(!repair_queue.is_empty(), self.cancel.is_cancelled()) {
            RunState::Repairing => {
                self.transition(RunState::Repairing);
                info!(
                    "Repair Service: Initiated. {} repair requests found. Starting the repair process.",
                    repair_queue.len()
                );
                let report = self.run_phase(repair_queue.clone(), WorkerMode::Repair).await;
                info!("Complete repair process.");
                repair = Some(report);
            }
            _ => {
                if !repair_queue.is_empty() {
                    warn!(
                        "Skipping repair of {} dump directories because the run was cancelled.",
                        repair_queue.len()
                    );
                }
            }
        }
        self.transition(RunState::Done);

        let schemas = |queue: &JobQueue| -> Vec<String> {
            queue
                .drain()
                .iter()
                .map(|job| job.target_schema(&self.options))
                .collect()
        };
        let not_attempted = schemas(&job_queue);
        let repair_skipped = schemas(&repair_queue);

        let mut interrupted = primary.interrupted.clone();
        let mut terminal_failures = Vec::new();
        if let Some(repair) = &repair {
            interrupted.extend(repair.interrupted.iter().cloned());
            terminal_failures.extend(repair.terminal_failures.iter().cloned());
        }
        for schema in &interrupted {
            warn!(%schema, "Restore was interrupted; the schema may be partially loaded");
        }

        let elapsed = self.clock.elapsed();
        info!(
            succeeded = primary.succeeded + repair.as_ref().map_or(0, |r| r.succeeded),
            terminal_failures = terminal_failures.len(),
            interrupted = interrupted.len(),
            not_attempted = not_attempted.len(),
            repair_skipped = repair_skipped.len(),
            "Complete restore the process with time usages: {:?}",
            elapsed
        );

        RunReport {
            run_id,
            started_at: self.clock.started_at(),
            elapsed_secs: elapsed.as_secs_f64(),
            final_state: self.state,
            cancelled: self.cancel.is_cancelled(),
            primary,
            repair,
            terminal_failures,
            interrupted,
            not_attempted,
            repair_skipped,
        }
    }

    /// Spawns one wave of workers against `queue` and waits for all of them.
    async fn run_phase(&self, queue: Arc<JobQueue>, mode: WorkerMode) -> PhaseReport {
        let phase = mode.phase();
        let mut workers = JoinSet::new();

        for id in 1..=self.workers.get() {
            let worker = Worker {
                id,
                queue: queue.clone(),
                mode: mode.clone(),
                executor: self.executor.clone(),
                credentials: self.credentials.clone(),
                options: self.options.clone(),
                cancel: self.cancel.clone(),
            };
            let span = info_span!("worker", worker.id = id, %phase);
            workers.spawn(worker.run().instrument(span));
        }

        let mut report = PhaseReport::default();
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(worker_report) => report.merge(worker_report),
                Err(error) => warn!(%error, %phase, "Restore worker task panicked"),
            }
        }

        info!(
            %phase,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Restore phase finished"
        );
        report
    }
}
