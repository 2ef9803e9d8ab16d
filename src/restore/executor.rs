// restoretool/src/restore/executor.rs
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::job::Job;
use crate::config::{Credentials, RestoreOptions};
use crate::errors::RestoreError;
use crate::utils::find_mysqlsh_executable;

/// Loads one dump into the target server.
///
/// Implementations must stop and return [`RestoreError::Cancelled`] once `cancel`
/// fires. Re-running a restore against an already loaded schema is not safe, so
/// callers decide about retries, never the executor.
pub trait RestoreExecutor: Send + Sync + 'static {
    fn restore(
        &self,
        job: &Job,
        credentials: &Credentials,
        options: &RestoreOptions,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), RestoreError>> + Send;
}

/// Runs `mysqlsh ... util.loadDump(...)` as a subprocess.
#[derive(Debug, Clone)]
pub struct MysqlShellExecutor {
    program: PathBuf,
}

impl MysqlShellExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Uses the configured binary, or looks `mysqlsh` up in PATH.
    pub fn locate(configured: Option<&Path>) -> anyhow::Result<Self> {
        match configured {
            Some(program) => Ok(Self::new(program)),
            None => find_mysqlsh_executable().map(Self::new),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RestoreExecutor for MysqlShellExecutor {
    async fn restore(
        &self,
        job: &Job,
        credentials: &Credentials,
        options: &RestoreOptions,
        cancel: &CancellationToken,
    ) -> Result<(), RestoreError> {
        if cancel.is_cancelled() {
            return Err(RestoreError::Cancelled);
        }
        if !job.source_path().is_dir() {
            return Err(RestoreError::Failed(format!(
                "dump directory {} does not exist",
                job.source_path().display()
            )));
        }

        debug!(
            schema = %job.target_schema(options),
            path = %job.source_path().display(),
            "Running util.loadDump"
        );

        let mut command = Command::new(&self.program);
        command
            .args(mysqlsh_args(job, credentials, options))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let deadline = async {
            match options.restore_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        // Dropping the output future kills the child.
        let output = tokio::select! {
            result = command.output() => result.map_err(|error| RestoreError::Spawn {
                program: self.program.clone(),
                error,
            })?,
            () = cancel.cancelled() => return Err(RestoreError::Cancelled),
            () = deadline => {
                return Err(RestoreError::TimedOut(options.restore_timeout.unwrap_or_default()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            return Err(RestoreError::Command {
                status: output.status,
                output: detail,
            });
        }

        Ok(())
    }
}

/// Command line for one restore:
/// `mysqlsh -h <host> -P <port> -u <user> --password=<secret> --js -e "util.loadDump(...)"`.
fn mysqlsh_args(job: &Job, credentials: &Credentials, options: &RestoreOptions) -> Vec<String> {
    vec![
        "-h".to_string(),
        credentials.host.clone(),
        "-P".to_string(),
        credentials.port.to_string(),
        "-u".to_string(),
        credentials.user.clone(),
        format!("--password={}", credentials.secret()),
        "--js".to_string(),
        "-e".to_string(),
        load_dump_script(job, options),
    ]
}

fn load_dump_script(job: &Job, options: &RestoreOptions) -> String {
    format!(
        "util.loadDump('{}', {{schema: '{}', threads: {}}})",
        js_single_quoted(&job.source_path().to_string_lossy()),
        js_single_quoted(&job.target_schema(options)),
        options.load_threads
    )
}

/// Escapes `s` for use inside a single-quoted JavaScript string literal.
fn js_single_quoted(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn credentials() -> Credentials {
        Credentials::new("10.0.0.5", 3306, "restore", "s3cr3t")
    }

    fn options() -> RestoreOptions {
        RestoreOptions {
            destination_prefix: "prod_".to_string(),
            ..RestoreOptions::default()
        }
    }

    #[test]
    fn test_mysqlsh_args_layout() {
        let job = Job::new("orders-staging", "/dumps/orders-staging");
        let args = mysqlsh_args(&job, &credentials(), &options());

        assert_eq!(
            args,
            vec![
                "-h",
                "10.0.0.5",
                "-P",
                "3306",
                "-u",
                "restore",
                "--password=s3cr3t",
                "--js",
                "-e",
                "util.loadDump('/dumps/orders-staging', {schema: 'prod_orders', threads: 4})",
            ]
        );
        assert!(!args[9].contains("s3cr3t"));
    }

    #[test]
    fn test_load_dump_script_escapes_quotes() {
        let job = Job::new("o'brien", "/dumps/it's\\here/o'brien");
        let options = RestoreOptions {
            load_threads: 2,
            ..options()
        };

        assert_eq!(
            load_dump_script(&job, &options),
            r"util.loadDump('/dumps/it\'s\\here/o\'brien', {schema: 'prod_o\'brien', threads: 2})"
        );
    }

    #[tokio::test]
    async fn test_missing_dump_directory_fails_without_spawning() {
        let executor = MysqlShellExecutor::new("/nonexistent/mysqlsh");
        let job = Job::new("gone", "/nonexistent/dumps/gone");

        let result = executor
            .restore(&job, &credentials(), &options(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RestoreError::Failed(_))));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() -> anyhow::Result<()> {
        let dumps = tempfile::tempdir()?;
        let executor = MysqlShellExecutor::new(dumps.path().join("no-such-mysqlsh"));
        let job = Job::new("orders", dumps.path());

        let result = executor
            .restore(&job, &credentials(), &options(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RestoreError::Spawn { .. })));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_decides_outcome() -> anyhow::Result<()> {
        let dumps = tempfile::tempdir()?;
        let job = Job::new("orders", dumps.path());

        let ok = MysqlShellExecutor::new("true")
            .restore(&job, &credentials(), &options(), &CancellationToken::new())
            .await;
        assert!(ok.is_ok());

        let failed = MysqlShellExecutor::new("false")
            .restore(&job, &credentials(), &options(), &CancellationToken::new())
            .await;
        match failed {
            Err(RestoreError::Command { status, .. }) => assert!(!status.success()),
            other => panic!("expected a command failure, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_spawning() -> anyhow::Result<()> {
        let dumps = tempfile::tempdir()?;
        let job = Job::new("orders", dumps.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = MysqlShellExecutor::new(dumps.path().join("no-such-mysqlsh"))
            .restore(&job, &credentials(), &options(), &cancel)
            .await;
        assert!(matches!(result, Err(RestoreError::Cancelled)));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_restore_times_out() -> anyhow::Result<()> {
        let dumps = tempfile::tempdir()?;
        let program = crate::restore::testing::fake_mysqlsh(dumps.path(), "exec sleep 5")?;
        let job = Job::new("orders", dumps.path());
        let options = RestoreOptions {
            restore_timeout: Some(Duration::from_millis(200)),
            ..options()
        };

        let started = Instant::now();
        let result = MysqlShellExecutor::new(program)
            .restore(&job, &credentials(), &options, &CancellationToken::new())
            .await;

        assert!(
            matches!(result, Err(RestoreError::TimedOut(t)) if t == Duration::from_millis(200)),
            "got {result:?}"
        );
        assert!(started.elapsed() < Duration::from_secs(3));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_stops_running_restore() -> anyhow::Result<()> {
        let dumps = tempfile::tempdir()?;
        let program = crate::restore::testing::fake_mysqlsh(dumps.path(), "exec sleep 5")?;
        let job = Job::new("orders", dumps.path());
        let cancel = CancellationToken::new();

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                cancel.cancel();
            }
        });

        let started = Instant::now();
        let result = MysqlShellExecutor::new(program)
            .restore(&job, &credentials(), &options(), &cancel)
            .await;

        assert!(matches!(result, Err(RestoreError::Cancelled)), "got {result:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
        Ok(())
    }
}
