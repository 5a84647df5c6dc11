// LogDigest - app/cleanup.rs
//
// Retention policy for the per-date working directory.
//
// Staged copies and the merged scratch file are transient: classification is
// their last consumer. Only the classified-lines artifact and the report
// survive a run. Deletion is best-effort: every item's outcome is collected
// and logged in bulk, and a failure never aborts the run.

use crate::platform::fs::remove_file_if_exists;
use crate::util::error::StagingError;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of removing one item.
#[derive(Debug)]
pub struct CleanupItem {
    pub path: PathBuf,
    pub outcome: io::Result<()>,
}

/// Collected outcomes of one cleanup pass.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub items: Vec<CleanupItem>,
}

impl CleanupReport {
    pub fn removed(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CleanupItem> {
        self.items.iter().filter(|i| i.outcome.is_err())
    }

    /// One debug line per removed item, one warning per failure, and a
    /// summary line.
    pub fn log(&self, phase: &str) {
        for item in &self.items {
            match &item.outcome {
                Ok(()) => tracing::debug!(phase, path = %item.path.display(), "Removed"),
                Err(e) => tracing::warn!(
                    phase,
                    path = %item.path.display(),
                    error = %e,
                    "Failed to remove; continuing"
                ),
            }
        }
        let failed = self.failures().count();
        if !self.items.is_empty() {
            tracing::info!(phase, removed = self.removed(), failed, "Cleanup complete");
        }
    }
}

/// Remove each path, recording per-item outcomes.
pub fn remove_all<'a, I>(paths: I) -> CleanupReport
where
    I: IntoIterator<Item = &'a Path>,
{
    CleanupReport {
        items: paths
            .into_iter()
            .map(|path| CleanupItem {
                path: path.to_path_buf(),
                outcome: remove_file_if_exists(path),
            })
            .collect(),
    }
}

/// Create the working directory if needed and clear stale state left by an
/// earlier run on the same date.
///
/// Every regular file except `keep` (the classified-lines artifact, which
/// is overwritten later) is removed: stale staged copies, scratch, and a
/// stale report. Subdirectories are left alone.
pub fn prepare_working_dir(working_dir: &Path, keep: &str) -> Result<CleanupReport, StagingError> {
    std::fs::create_dir_all(working_dir).map_err(|source| StagingError::CreateWorkingDir {
        path: working_dir.to_path_buf(),
        source,
    })?;

    let list_err = |source: io::Error| StagingError::ListWorkingDir {
        path: working_dir.to_path_buf(),
        source,
    };

    let mut stale: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(working_dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && entry.file_name() != keep {
            stale.push(entry.path());
        }
    }
    stale.sort();

    Ok(remove_all(stale.iter().map(PathBuf::as_path)))
}
