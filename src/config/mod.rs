// restoretool/src/config/mod.rs
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::restore::job::DEFAULT_STAGING_SUFFIX;
use crate::restore::scanner::ScanErrorPolicy;

/// Overrides `database.db_password` when set (also read from `.env`).
pub const PASSWORD_ENV_VAR: &str = "RESTORETOOL_DB_PASSWORD";

const DEFAULT_LOAD_THREADS: u32 = 4;

// Structs for deserializing config.yaml
#[derive(Debug, Clone, Deserialize)]
pub struct RawYamlConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logger: LoggerSection,
    pub software: SoftwareSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub address: String,
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSection {
    pub db_user: String,
    #[serde(default)]
    pub db_password: String,
}

impl fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerSection {
    pub log_directory: PathBuf,
    pub log_filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoftwareSection {
    #[serde(default)]
    pub destination_prefix: String,
    pub restore_threads: i64,
    #[serde(alias = "dump_file_directories")]
    pub dump_file_directorys: String,
    #[serde(default = "default_load_threads")]
    pub load_threads: u32,
    #[serde(default = "default_staging_suffix")]
    pub staging_suffix: String,
    #[serde(default)]
    pub restore_timeout_secs: Option<u64>,
    #[serde(default)]
    pub on_scan_error: ScanErrorPolicy,
    #[serde(default)]
    pub mysqlsh_path: Option<PathBuf>,
    #[serde(default)]
    pub preflight_check: bool,
    #[serde(default)]
    pub report_file: Option<PathBuf>,
}

fn default_load_threads() -> u32 {
    DEFAULT_LOAD_THREADS
}

fn default_staging_suffix() -> String {
    DEFAULT_STAGING_SUFFIX.to_string()
}

// Application's internal configuration structs

/// Connection parameters for the destination server.
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    secret: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Run-wide knobs shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub destination_prefix: String,
    pub staging_suffix: String,
    /// Parallelism hint handed to `util.loadDump`.
    pub load_threads: u32,
    pub restore_timeout: Option<Duration>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            destination_prefix: String::new(),
            staging_suffix: DEFAULT_STAGING_SUFFIX.to_string(),
            load_threads: DEFAULT_LOAD_THREADS,
            restore_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    pub log_filename: String,
}

impl LoggingConfig {
    pub fn log_file_path(&self) -> PathBuf {
        self.log_directory.join(&self.log_filename)
    }
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub options: RestoreOptions,
    /// Raw value from the config file; validated when a run starts.
    pub restore_threads: i64,
    pub dump_directories: Vec<PathBuf>,
    pub on_scan_error: ScanErrorPolicy,
    pub mysqlsh_path: Option<PathBuf>,
    pub preflight_check: bool,
    pub report_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub logging: LoggingConfig,
    pub restore: RestoreConfig,
}

impl AppConfig {
    pub fn load_from_yaml(config_path: &Path) -> Result<Self, ConfigError> {
        let config_content =
            fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
        let raw: RawYamlConfig =
            serde_yaml::from_str(&config_content).map_err(|source| ConfigError::Parse {
                path: config_path.to_path_buf(),
                source,
            })?;

        Self::from_raw(raw, env::var(PASSWORD_ENV_VAR).ok())
    }

    pub fn from_raw(
        raw: RawYamlConfig,
        password_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        if raw.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.address cannot be empty".to_string(),
            ));
        }
        if raw.database.db_user.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "database.db_user cannot be empty".to_string(),
            ));
        }
        if raw.logger.log_filename.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "logger.log_filename cannot be empty".to_string(),
            ));
        }
        if raw.software.load_threads == 0 {
            return Err(ConfigError::Invalid(
                "software.load_threads must be greater than zero".to_string(),
            ));
        }

        let dump_directories = split_dump_directories(&raw.software.dump_file_directorys);
        if dump_directories.is_empty() {
            return Err(ConfigError::Invalid(
                "software.dump_file_directorys must list at least one directory".to_string(),
            ));
        }

        let secret = password_override
            .filter(|s| !s.is_empty())
            .unwrap_or(raw.database.db_password);

        Ok(AppConfig {
            credentials: Credentials::new(
                raw.server.address.trim(),
                raw.server.port,
                raw.database.db_user,
                secret,
            ),
            logging: LoggingConfig {
                log_directory: raw.logger.log_directory,
                log_filename: raw.logger.log_filename,
            },
            restore: RestoreConfig {
                options: RestoreOptions {
                    destination_prefix: raw.software.destination_prefix,
                    staging_suffix: raw.software.staging_suffix,
                    load_threads: raw.software.load_threads,
                    restore_timeout: raw.software.restore_timeout_secs.map(Duration::from_secs),
                },
                restore_threads: raw.software.restore_threads,
                dump_directories,
                on_scan_error: raw.software.on_scan_error,
                mysqlsh_path: raw.software.mysqlsh_path,
                preflight_check: raw.software.preflight_check,
                report_file: raw.software.report_file,
            },
        })
    }
}

/// `conf/config.yaml` next to the running executable.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let executable = env::current_exe().map_err(ConfigError::ExecutableDir)?;
    let base_dir = executable.parent().unwrap_or_else(|| Path::new("."));
    Ok(base_dir.join("conf").join("config.yaml"))
}

/// Splits the comma separated dump directory list, dropping blank entries.
fn split_dump_directories(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
