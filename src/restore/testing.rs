//! Deterministic executors for exercising the worker pool without a MySQL server.

use std::collections::HashMap;
#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::executor::RestoreExecutor;
use super::job::Job;
use crate::config::{Credentials, RestoreOptions};
use crate::errors::RestoreError;

/// Records every attempt per `source_name` and fails when `fail_when(job, attempt)` says so.
pub(crate) struct RecordingExecutor {
    attempts: Mutex<HashMap<String, usize>>,
    fail_when: fn(&Job, usize) -> bool,
}

impl RecordingExecutor {
    pub(crate) fn new(fail_when: fn(&Job, usize) -> bool) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            fail_when,
        }
    }

    pub(crate) fn always_ok() -> Self {
        Self::new(|_, _| false)
    }

    pub(crate) fn always_fail() -> Self {
        Self::new(|_, _| true)
    }

    pub(crate) fn attempts(&self, source_name: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(source_name)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_attempts(&self) -> usize {
        self.attempts.lock().unwrap().values().sum()
    }
}

impl RestoreExecutor for RecordingExecutor {
    async fn restore(
        &self,
        job: &Job,
        _credentials: &Credentials,
        _options: &RestoreOptions,
        _cancel: &CancellationToken,
    ) -> Result<(), RestoreError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(job.source_name().to_string()).or_default();
            *count += 1;
            *count
        };

        // Give other workers a chance to interleave.
        tokio::task::yield_now().await;

        if (self.fail_when)(job, attempt) {
            Err(RestoreError::Failed(format!(
                "stub failure for {} (attempt {})",
                job.source_name(),
                attempt
            )))
        } else {
            Ok(())
        }
    }
}

/// Fails jobs matching `fail_when` at once and blocks every other job until the
/// run is cancelled. `started` is notified when a blocking restore begins.
pub(crate) struct StallingExecutor {
    pub(crate) started: Notify,
    fail_when: fn(&Job) -> bool,
}

impl StallingExecutor {
    pub(crate) fn new(fail_when: fn(&Job) -> bool) -> Self {
        Self {
            started: Notify::new(),
            fail_when,
        }
    }
}

impl RestoreExecutor for StallingExecutor {
    async fn restore(
        &self,
        job: &Job,
        _credentials: &Credentials,
        _options: &RestoreOptions,
        cancel: &CancellationToken,
    ) -> Result<(), RestoreError> {
        if (self.fail_when)(job) {
            return Err(RestoreError::Failed(format!("stub failure for {}", job.source_name())));
        }
        self.started.notify_one();
        cancel.cancelled().await;
        Err(RestoreError::Cancelled)
    }
}

/// Writes an executable `/bin/sh` script standing in for `mysqlsh`.
#[cfg(unix)]
pub(crate) fn fake_mysqlsh(dir: &Path, body: &str) -> std::io::Result<PathBuf> {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("mysqlsh");
    {
        let mut file = fs::File::create(&path)?;
        writeln!(file, "#!/bin/sh\n{body}")?;
        file.sync_all()?;
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

pub(crate) fn credentials() -> Credentials {
    Credentials::new("127.0.0.1", 3306, "root", "secret")
}

pub(crate) fn prod_options() -> RestoreOptions {
    RestoreOptions {
        destination_prefix: "prod_".to_string(),
        ..RestoreOptions::default()
    }
}

pub(crate) fn jobs(names: &[&str]) -> Vec<Job> {
    names
        .iter()
        .map(|name| Job::new(*name, format!("/dumps/{name}")))
        .collect()
}
