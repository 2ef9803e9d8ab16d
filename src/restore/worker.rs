use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::RestoreExecutor;
use super::queue::JobQueue;
use super::report::{Phase, WorkerReport};
use crate::config::{Credentials, RestoreOptions};
use crate::errors::RestoreError;

#[derive(Debug, Clone)]
pub(crate) enum WorkerMode {
    /// Failed jobs are handed to `repair_queue` for one more attempt.
    Primary { repair_queue: Arc<JobQueue> },
    /// Failed jobs are final.
    Repair,
}

impl WorkerMode {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            WorkerMode::Primary { .. } => Phase::Primary,
            WorkerMode::Repair => Phase::Repair,
        }
    }
}

pub(crate) struct Worker<E> {
    pub(crate) id: usize,
    pub(crate) queue: Arc<JobQueue>,
    pub(crate) mode: WorkerMode,
    pub(crate) executor: Arc<E>,
    pub(crate) credentials: Arc<Credentials>,
    pub(crate) options: Arc<RestoreOptions>,
    pub(crate) cancel: CancellationToken,
}

impl<E: RestoreExecutor> Worker<E> {
    /// Restore jobs until the queue is drained or the run is cancelled.
    pub(crate) async fn run(self) -> WorkerReport {
        let mut report = WorkerReport::new(self.id, self.mode.phase());

        loop {
            if self.cancel.is_cancelled() {
                debug!("Cancellation requested. Shutting down the worker…");
                break;
            }
            let Some(job) = self.queue.try_take() else {
                break;
            };

            let schema = job.target_schema(&self.options);
            report.attempted += 1;

            let result = self
                .executor
                .restore(&job, &self.credentials, &self.options, &self.cancel)
                .await;

            match result {
                Ok(()) => {
                    report.succeeded += 1;
                    debug!(%schema, "Restored schema");
                }
                Err(RestoreError::Cancelled) => {
                    report.cancelled += 1;
                    warn!(%schema, "Restore cancelled mid-flight");
                    report.interrupted.push(schema);
                    break;
                }
                Err(err) => {
                    report.failed += 1;
                    match &self.mode {
                        WorkerMode::Primary { repair_queue } => {
                            warn!(
                                "Worker {}: error from restore database name {} from path {}: {}",
                                self.id,
                                schema,
                                job.source_path().display(),
                                err
                            );
                            info!("Enqueue {} to repair queue.", job.source_name());
                            repair_queue.enqueue(job);
                        }
                        WorkerMode::Repair => {
                            error!(
                                "Repair Service: Worker {}: failed to restore {} to destination MySQL server: {}",
                                self.id, schema, err
                            );
                            report.terminal_failures.push(schema);
                        }
                    }
                }
            }
        }

        info!(
            "Worker {}: Complete restore database to MySQL with error report: {}",
            self.id, report.failed
        );
        report
    }
}
