pub mod setting;

use anyhow::{Context, Result};
use std::path::PathBuf;
use which::which;

/// Finds the mysqlsh executable in the system PATH.
pub fn find_mysqlsh_executable() -> Result<PathBuf> {
    which("mysqlsh").context("mysqlsh executable not found in PATH. Please ensure MySQL Shell is installed and in your PATH, or set software.mysqlsh_path.")
}
