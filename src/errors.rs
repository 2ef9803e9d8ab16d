use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a run before any restore is attempted.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML from config file at {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to locate the executable directory")]
    ExecutableDir(#[source] std::io::Error),

    #[error("restore_threads must be a positive integer, got {0}")]
    InvalidThreadCount(i64),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Dump directory {} is not accessible", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read dump directory {}", .path.display())]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Dump directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("None of the {0} configured dump directories could be read")]
    NoReadableRoots(usize),
}

/// Outcome of a single failed restore attempt.
///
/// These are logged and counted by the workers, never propagated as run-level errors.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Failed to spawn {}: {}", .program.display(), .error)]
    Spawn {
        program: PathBuf,
        error: std::io::Error,
    },

    /// `output` is stderr, or stdout when stderr was empty.
    #[error("mysqlsh exited with {status}: {output}")]
    Command { status: ExitStatus, output: String },

    #[error("Restore timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Restore cancelled")]
    Cancelled,

    #[error("Restore failed: {0}")]
    Failed(String),
}
