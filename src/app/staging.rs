// LogDigest - app/staging.rs
//
// Copies today's source files into the per-date working directory and merges
// the copies into the transient scratch file.
//
// Staged names encode provenance as `<server>_<original name>`; the
// provenance map is kept alongside for O(1) lookup. Per-file copy and read
// failures are non-fatal: the file is skipped and a warning recorded.

use crate::core::model::{Provenance, SourceFile, StagedFile};
use crate::util::constants;
use crate::util::error::StagingError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Result of the staging step.
#[derive(Debug, Default)]
pub struct StagingOutcome {
    /// Staged copies, sorted by staged path.
    pub staged: Vec<StagedFile>,

    /// Staged path -> origin server.
    pub provenance: Provenance,

    /// Non-fatal per-file problems.
    pub warnings: Vec<String>,
}

/// Copy every source file into `working_dir`.
///
/// The returned files are sorted lexicographically by staged path, which is
/// the canonical processing order for merge and classification.
pub fn stage_sources(sources: &[SourceFile], working_dir: &Path) -> Result<StagingOutcome, StagingError> {
    let mut outcome = StagingOutcome::default();
    let mut taken: HashSet<String> = HashSet::new();

    for source in sources {
        let name = staged_name(&source.server, &source.file_name, &taken)?;
        let dest = working_dir.join(&name);

        match std::fs::copy(&source.path, &dest) {
            Ok(bytes) => {
                tracing::debug!(
                    from = %source.path.display(),
                    to = %dest.display(),
                    bytes,
                    "Staged source file"
                );
                taken.insert(name);
                outcome.provenance.insert(dest.clone(), source.server.clone());
                outcome.staged.push(StagedFile {
                    server: source.server.clone(),
                    original_name: source.file_name.clone(),
                    staged_path: dest,
                });
            }
            Err(e) => {
                let msg = format!("Cannot copy '{}': {e}", source.path.display());
                tracing::warn!(warning = %msg, "Staging warning");
                outcome.warnings.push(msg);
            }
        }
    }

    outcome.staged.sort_by(|a, b| a.staged_path.cmp(&b.staged_path));
    Ok(outcome)
}

/// `<server>_<file>`, or `<server>_<stem>-<n>.<ext>` when that name is
/// already used by an earlier source in this run.
fn staged_name(server: &str, file_name: &str, taken: &HashSet<String>) -> Result<String, StagingError> {
    let base = format!("{server}{}{file_name}", constants::STAGED_NAME_SEPARATOR);
    if !taken.contains(&base) {
        return Ok(base);
    }

    let path = Path::new(&base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&base)
        .to_string();
    let ext = path.extension().and_then(|e| e.to_str());

    for n in 1..=constants::MAX_STAGED_NAME_SUFFIX {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if !taken.contains(&candidate) {
            tracing::warn!(
                server,
                file = file_name,
                staged = %candidate,
                "Staged name collision; using suffixed name"
            );
            return Ok(candidate);
        }
    }

    Err(StagingError::NameExhausted {
        server: server.to_string(),
        file_name: file_name.to_string(),
    })
}

/// Summary of the merge step.
#[derive(Debug)]
pub struct MergeSummary {
    pub path: PathBuf,
    pub files_merged: usize,
    pub bytes_written: u64,
    pub warnings: Vec<String>,
}

/// Concatenate the staged files (already in canonical order) into
/// `scratch`, each followed by a newline. Any existing scratch file is
/// replaced.
pub fn merge_staged(staged: &[StagedFile], scratch: &Path) -> Result<MergeSummary, StagingError> {
    let write_err = |source: std::io::Error| StagingError::MergeScratch {
        path: scratch.to_path_buf(),
        source,
    };

    let file = File::create(scratch).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    let mut summary = MergeSummary {
        path: scratch.to_path_buf(),
        files_merged: 0,
        bytes_written: 0,
        warnings: Vec::new(),
    };

    for file in staged {
        let bytes = match std::fs::read(&file.staged_path) {
            Ok(b) => b,
            Err(e) => {
                let msg = format!("Cannot read '{}' for merge: {e}", file.staged_path.display());
                tracing::warn!(warning = %msg, "Merge warning");
                summary.warnings.push(msg);
                continue;
            }
        };
        out.write_all(&bytes).map_err(write_err)?;
        out.write_all(b"\n").map_err(write_err)?;
        summary.files_merged += 1;
        summary.bytes_written += bytes.len() as u64 + 1;
        tracing::debug!(file = %file.staged_path.display(), "Merged into scratch");
    }

    out.flush().map_err(write_err)?;
    Ok(summary)
}
