// LogDigest - app/analyze.rs
//
// Classify the staged copies and persist the classified-lines artifact.
//
// Staged files are read in staged-path order, so the artifact and the
// report list lines in the same deterministic order on every run. The
// artifact is written before any staged copy is removed; once it is on disk
// the staged copies and the merged scratch file are deleted.

use crate::app::cleanup::{self, CleanupReport};
use crate::core::classify::Classifier;
use crate::core::model::{Classification, KeywordSet, Provenance, StagedFile};
use crate::core::report::render_classified_lines;
use crate::platform::fs::{read_file_lossy, write_atomic};
use crate::util::constants;
use crate::util::error::ArtifactError;
use std::path::{Path, PathBuf};

/// Result of the analyze step.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub classification: Classification,

    /// Path of the persisted classified-lines artifact.
    pub classified_path: PathBuf,

    /// Staged copies and scratch file removed after classification.
    pub cleanup: CleanupReport,

    /// Non-fatal per-file problems.
    pub warnings: Vec<String>,
}

/// Classify every staged file, write `errorless.txt` into `working_dir`,
/// then remove the staged copies and `scratch`.
///
/// The origin server is looked up in `provenance`; a staged path without an
/// entry is attributed to `Unknown`.
pub fn analyze_staged(
    staged: &[StagedFile],
    provenance: &Provenance,
    keywords: &KeywordSet,
    working_dir: &Path,
    scratch: &Path,
) -> Result<AnalysisOutcome, ArtifactError> {
    let mut classifier = Classifier::new(keywords);
    let mut warnings = Vec::new();

    let mut ordered: Vec<&StagedFile> = staged.iter().collect();
    ordered.sort_by(|a, b| a.staged_path.cmp(&b.staged_path));

    for file in &ordered {
        let server = provenance
            .get(&file.staged_path)
            .map(String::as_str)
            .unwrap_or(constants::UNKNOWN_SERVER);

        let content = match read_file_lossy(&file.staged_path) {
            Ok(c) => c,
            Err(e) => {
                let msg = format!("Cannot read '{}': {e}", file.staged_path.display());
                tracing::warn!(warning = %msg, "Classification warning");
                warnings.push(msg);
                continue;
            }
        };

        let matched = classifier.classify_content(server, &content);
        tracing::debug!(
            file = %file.staged_path.display(),
            server,
            matched,
            total = classifier.line_count(),
            "Classified staged file"
        );
    }

    let classification = classifier.finish();
    let classified_path = working_dir.join(constants::CLASSIFIED_FILE_NAME);
    let rendered = render_classified_lines(&classification.lines);
    write_atomic(&classified_path, rendered.as_bytes()).map_err(|source| ArtifactError::Io {
        path: classified_path.clone(),
        source,
    })?;
    tracing::info!(
        path = %classified_path.display(),
        lines = classification.lines.len(),
        files = classification.files_read,
        "Classified lines written"
    );

    let transient = ordered
        .iter()
        .map(|f| f.staged_path.as_path())
        .chain(std::iter::once(scratch));
    let cleanup = cleanup::remove_all(transient);
    cleanup.log("post-classify");

    Ok(AnalysisOutcome {
        classification,
        classified_path,
        cleanup,
        warnings,
    })
}
