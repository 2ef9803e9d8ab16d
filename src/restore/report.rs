use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Start of a run, taken before the configuration is read.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started: Instant,
    started_at: DateTime<Local>,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: Local::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Primary,
    Repair,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Primary => write!(f, "primary"),
            Phase::Repair => write!(f, "repair"),
        }
    }
}

/// Where a run is in its lifecycle.
///
/// `Scanning -> PrimaryRestore -> (Repairing ->) Done`; `Repairing` is only
/// entered when the primary phase left jobs in the repair queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Scanning,
    PrimaryRestore,
    Repairing,
    Done,
}

impl RunState {
    /// State that follows a completed primary phase.
    pub fn after_primary(repairs_pending: bool, cancelled: bool) -> RunState {
        if repairs_pending && !cancelled {
            RunState::Repairing
        } else {
            RunState::Done
        }
    }
}

/// Counters owned by a single worker for one phase.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub phase: Phase,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Schemas this worker gave up on (repair phase only).
    pub terminal_failures: Vec<String>,
    /// Schemas whose restore was running when the run was cancelled.
    pub interrupted: Vec<String>,
}

impl WorkerReport {
    pub fn new(worker_id: usize, phase: Phase) -> Self {
        Self {
            worker_id,
            phase,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            terminal_failures: Vec::new(),
            interrupted: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub workers: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub terminal_failures: Vec<String>,
    pub interrupted: Vec<String>,
}

impl PhaseReport {
    pub fn merge(&mut self, worker: WorkerReport) {
        self.workers += 1;
        self.attempted += worker.attempted;
        self.succeeded += worker.succeeded;
        self.failed += worker.failed;
        self.cancelled += worker.cancelled;
        self.terminal_failures.extend(worker.terminal_failures);
        self.interrupted.extend(worker.interrupted);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub elapsed_secs: f64,
    pub final_state: RunState,
    pub cancelled: bool,
    pub primary: PhaseReport,
    pub repair: Option<PhaseReport>,
    /// Schemas that failed both the primary and the repair attempt.
    pub terminal_failures: Vec<String>,
    /// Schemas whose restore was stopped part way by cancellation, in either phase.
    /// Their target schema may hold partially loaded data.
    pub interrupted: Vec<String>,
    /// Schemas still in the primary queue when the run was cancelled.
    pub not_attempted: Vec<String>,
    /// Schemas that failed the primary attempt and were not retried because
    /// the run was cancelled.
    pub repair_skipped: Vec<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.primary.succeeded + self.repair.as_ref().map_or(0, |r| r.succeeded)
    }

    pub fn terminal_failure_count(&self) -> usize {
        self.terminal_failures.len()
    }

    /// Schemas that did not end up restored, for whatever reason.
    pub fn unrestored(&self) -> impl Iterator<Item = &String> {
        self.terminal_failures
            .iter()
            .chain(&self.interrupted)
            .chain(&self.not_attempted)
            .chain(&self.repair_skipped)
    }

    /// Every discovered job ended up restored.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.unrestored().next().is_none()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for run report: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        Ok(())
    }
}
