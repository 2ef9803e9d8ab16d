use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::RestoreOptions;

/// Dump directories are usually named `<database>-staging`.
pub const DEFAULT_STAGING_SUFFIX: &str = "-staging";

/// One dump directory to be loaded into one target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    source_name: String,
    source_path: PathBuf,
}

impl Job {
    pub fn new(source_name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_name: source_name.into(),
            source_path: source_path.into(),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Directory name with the staging suffix removed from its end.
    pub fn schema_name(&self, staging_suffix: &str) -> &str {
        if staging_suffix.is_empty() {
            return &self.source_name;
        }
        self.source_name
            .strip_suffix(staging_suffix)
            .unwrap_or(&self.source_name)
    }

    /// Prefixed schema the dump is restored into.
    pub fn target_schema(&self, options: &RestoreOptions) -> String {
        format!(
            "{}{}",
            options.destination_prefix,
            self.schema_name(&options.staging_suffix)
        )
    }
}
