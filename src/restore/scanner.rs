// restoretool/src/restore/scanner.rs
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::job::Job;
use super::queue::JobQueue;
use crate::errors::ScanError;

/// What to do with a configured dump directory that cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanErrorPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log a warning and continue with the remaining directories.
    Skip,
}

/// Builds the job queue from the immediate subdirectories of every root.
///
/// Plain files are ignored. Jobs are enqueued root by root, sorted by name
/// within a root. With [`ScanErrorPolicy::Skip`] the scan still fails when no
/// root at all could be read.
pub fn scan_dump_directories(
    roots: &[PathBuf],
    policy: ScanErrorPolicy,
) -> Result<JobQueue, ScanError> {
    let queue = JobQueue::new();
    let mut readable_roots = 0;

    info!(
        "Complete reading the dump directory. Total directory: {}",
        roots.len()
    );
    info!("Start enqueue file in directory...");

    for root in roots {
        match scan_root(root) {
            Ok(jobs) => {
                readable_roots += 1;
                let count = jobs.len();
                for job in jobs {
                    queue.enqueue(job);
                }
                info!(count, "Complete enqueue all directory in {}", root.display());
            }
            Err(error) => match policy {
                ScanErrorPolicy::Abort => return Err(error),
                ScanErrorPolicy::Skip => {
                    warn!(?error, "Skipping dump directory {}", root.display());
                }
            },
        }
    }

    if readable_roots == 0 && !roots.is_empty() {
        return Err(ScanError::NoReadableRoots(roots.len()));
    }

    Ok(queue)
}

fn scan_root(root: &Path) -> Result<Vec<Job>, ScanError> {
    let metadata = fs::metadata(root).map_err(|source| ScanError::Inaccessible {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ScanError::ReadRoot {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        jobs.push(Job::new(
            entry.file_name().to_string_lossy(),
            entry.path(),
        ));
    }
    Ok(jobs)
}
