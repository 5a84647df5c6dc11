// LogDigest - app/pipeline.rs
//
// Orchestrates one run for one date:
//
//   validate root -> lock -> prepare working dir -> discover -> stage + merge
//   -> classify + persist -> cleanup -> report -> notify
//
// Each stage yields a `StageOutcome`. `Empty` ends the run cleanly with the
// carried `RunOutcome`; `Failed` ends it with a fatal error. The run lock is
// held for the whole run and released on every exit path.

use crate::app::analyze::analyze_staged;
use crate::app::cleanup::prepare_working_dir;
use crate::app::notify::{DeliveryStatus, Notification, Notifier};
use crate::app::staging::{merge_staged, stage_sources, StagingOutcome};
use crate::core::discovery::{discover_sources, validate_root, DiscoveryConfig};
use crate::core::model::{KeywordSet, Report};
use crate::core::report::{self, ReportDecision, ReportParams};
use crate::platform::fs::write_atomic;
use crate::platform::lock::RunLock;
use crate::util::constants;
use crate::util::error::{ArtifactError, LogDigestError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything one run needs, resolved from config and CLI.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub root_dir: PathBuf,
    /// `YYYY-MM-DD`
    pub date: String,
    pub keywords: KeywordSet,
    /// Must be a member of `keywords`.
    pub primary_keyword: String,
    pub threshold: usize,
}

impl RunSettings {
    /// `root/<date>`
    pub fn working_dir(&self) -> PathBuf {
        self.root_dir.join(&self.date)
    }

    /// `root/<date>.lock`
    pub fn lock_path(&self) -> PathBuf {
        self.root_dir
            .join(format!("{}.{}", self.date, constants::LOCK_FILE_EXTENSION))
    }
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No source file for the date was found.
    NoSourceFiles,

    /// Classified lines were persisted but were too few to report.
    BelowThreshold { classified: usize, threshold: usize },

    /// A report was written and handed to the notifier.
    Reported {
        report_path: PathBuf,
        delivery: DeliveryStatus,
    },
}

/// Result of one pipeline stage.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage produced input for the next one.
    Produced(T),

    /// Nothing left to do; the run ends with this outcome.
    Empty(RunOutcome),

    /// The run cannot continue.
    Failed(LogDigestError),
}

impl<T, E: Into<LogDigestError>> From<std::result::Result<T, E>> for StageOutcome<T> {
    fn from(r: std::result::Result<T, E>) -> Self {
        match r {
            Ok(v) => Self::Produced(v),
            Err(e) => Self::Failed(e.into()),
        }
    }
}

/// Unwrap a `Produced` value or leave `run` with the terminal outcome.
macro_rules! stage {
    ($outcome:expr) => {
        match $outcome {
            StageOutcome::Produced(v) => v,
            StageOutcome::Empty(done) => return Ok(done),
            StageOutcome::Failed(e) => return Err(e),
        }
    };
}

/// Execute one run. `notifier == None` disables delivery.
pub fn run(settings: &RunSettings, notifier: Option<&dyn Notifier>) -> Result<RunOutcome> {
    let root = settings.root_dir.as_path();
    let working_dir = settings.working_dir();

    tracing::info!(
        root = %root.display(),
        date = %settings.date,
        keywords = ?settings.keywords.iter().collect::<Vec<_>>(),
        threshold = settings.threshold,
        "Run starting"
    );

    // The root must exist before anything (lock, working dir) is created in it.
    stage!(StageOutcome::from(validate_root(root)));

    let lock = stage!(StageOutcome::from(RunLock::acquire(
        &settings.lock_path(),
        &settings.date,
        Duration::from_secs(constants::LOCK_STALE_AFTER_SECS),
    )));
    tracing::debug!(lock = %lock.path().display(), "Working directory claimed");

    let stale = stage!(StageOutcome::from(prepare_working_dir(
        &working_dir,
        constants::CLASSIFIED_FILE_NAME,
    )));
    stale.log("stale-state");

    let staging = stage!(stage_and_merge(settings, &working_dir));
    let files_processed = staging.staged.len();
    let scratch = working_dir.join(report::merged_scratch_name(&settings.date));

    let analysis = stage!(StageOutcome::from(analyze_staged(
        &staging.staged,
        &staging.provenance,
        &settings.keywords,
        &working_dir,
        &scratch,
    )));
    let classification = analysis.classification;

    let primary = primary_keyword(settings);
    let params = ReportParams {
        date: &settings.date,
        files_processed,
        primary_keyword: primary,
        threshold: settings.threshold,
    };
    let outcome = match report::build_report(&classification, &params) {
        ReportDecision::BelowThreshold {
            classified,
            threshold,
        } => {
            tracing::info!(classified, threshold, "Below threshold; no report produced");
            RunOutcome::BelowThreshold {
                classified,
                threshold,
            }
        }
        ReportDecision::Produced(report) => {
            let report_path = stage!(persist_report(&report, &working_dir));
            let delivery = match notifier {
                Some(n) => n.notify(&Notification {
                    report_path: report_path.clone(),
                    date: settings.date.clone(),
                    error_count: classification.tally.get(primary),
                })?,
                None => {
                    tracing::info!("Notification disabled");
                    DeliveryStatus::Disabled
                }
            };
            RunOutcome::Reported {
                report_path,
                delivery,
            }
        }
    };

    tracing::info!(
        files = files_processed,
        classified = classification.lines.len(),
        matches = classification.tally.total(),
        counts = %classification.tally.summary(),
        outcome = ?outcome,
        "Run complete"
    );
    Ok(outcome)
}

/// The configured primary keyword, or the first keyword of the set when it
/// is not a member.
fn primary_keyword(settings: &RunSettings) -> &str {
    if settings.keywords.contains(&settings.primary_keyword) {
        return &settings.primary_keyword;
    }
    let fallback = settings
        .keywords
        .iter()
        .next()
        .unwrap_or(settings.primary_keyword.as_str());
    tracing::warn!(
        primary = %settings.primary_keyword,
        fallback,
        "Primary keyword is not in the keyword set"
    );
    fallback
}

fn stage_and_merge(settings: &RunSettings, working_dir: &Path) -> StageOutcome<StagingOutcome> {
    let config = DiscoveryConfig::for_date(settings.date.clone());
    let (sources, warnings) = match discover_sources(&settings.root_dir, &config) {
        Ok(found) => found,
        Err(e) => return StageOutcome::Failed(e.into()),
    };
    for w in &warnings {
        tracing::warn!(warning = %w, "Discovery warning");
    }
    if sources.is_empty() {
        tracing::info!(date = %settings.date, "No source files for date; nothing to do");
        // A classified-lines artifact from an earlier run describes sources
        // that are gone; leave an empty one instead.
        let classified = working_dir.join(constants::CLASSIFIED_FILE_NAME);
        if let Err(source) = write_atomic(&classified, b"") {
            return StageOutcome::Failed(
                ArtifactError::Io {
                    path: classified,
                    source,
                }
                .into(),
            );
        }
        return StageOutcome::Empty(RunOutcome::NoSourceFiles);
    }
    tracing::info!(count = sources.len(), "Source files found");

    let staging = match stage_sources(&sources, working_dir) {
        Ok(s) => s,
        Err(e) => return StageOutcome::Failed(e.into()),
    };

    let scratch = working_dir.join(report::merged_scratch_name(&settings.date));
    match merge_staged(&staging.staged, &scratch) {
        Ok(summary) => {
            tracing::debug!(
                path = %summary.path.display(),
                files = summary.files_merged,
                bytes = summary.bytes_written,
                "Merged scratch written"
            );
            StageOutcome::Produced(staging)
        }
        Err(e) => StageOutcome::Failed(e.into()),
    }
}

fn persist_report(report: &Report, working_dir: &Path) -> StageOutcome<PathBuf> {
    let path = working_dir.join(report::report_file_name(&report.report_date));
    let bytes = match report::render_report_json(report) {
        Ok(b) => b,
        Err(source) => {
            return StageOutcome::Failed(ArtifactError::Json { path, source }.into());
        }
    };
    match write_atomic(&path, &bytes) {
        Ok(()) => {
            tracing::info!(
                path = %path.display(),
                critical = report.critical_lines.len(),
                "Report written"
            );
            StageOutcome::Produced(path)
        }
        Err(source) => StageOutcome::Failed(ArtifactError::Io { path, source }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn settings(root: &Path) -> RunSettings {
        RunSettings {
            root_dir: root.to_path_buf(),
            date: "2024-01-01".to_string(),
            keywords: KeywordSet::default(),
            primary_keyword: "error".to_string(),
            threshold: 10,
        }
    }

    #[test]
    fn test_paths_derive_from_root_and_date() {
        let s = settings(Path::new("/logs"));
        assert_eq!(s.working_dir(), Path::new("/logs/2024-01-01"));
        assert_eq!(s.lock_path(), Path::new("/logs/2024-01-01.lock"));
    }

    #[test]
    fn test_primary_keyword_outside_set_falls_back_to_first() {
        let mut s = settings(Path::new("/logs"));
        assert_eq!(primary_keyword(&s), "error");
        s.primary_keyword = "panic".to_string();
        assert_eq!(primary_keyword(&s), "error");
        s.keywords = KeywordSet::new(["timeout", "panic"]);
        assert_eq!(primary_keyword(&s), "panic");
    }

    #[test]
    fn test_no_sources_is_clean_empty_outcome() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();
        fs::write(dir.path().join("web").join("2023-12-31.log"), "ERROR old").unwrap();

        let outcome = run(&settings(dir.path()), None).unwrap();
        assert_eq!(outcome, RunOutcome::NoSourceFiles);
        assert!(!dir.path().join("2024-01-01.lock").exists());
    }

    #[test]
    fn test_rerun_without_sources_empties_classified_lines() {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("web");
        fs::create_dir(&web).unwrap();
        let source = web.join("2024-01-01.log");
        let lines: String = (0..12).map(|i| format!("ERROR {i}\n")).collect();
        fs::write(&source, lines).unwrap();
        let s = settings(dir.path());

        assert!(matches!(run(&s, None).unwrap(), RunOutcome::Reported { .. }));
        fs::remove_file(&source).unwrap();

        assert_eq!(run(&s, None).unwrap(), RunOutcome::NoSourceFiles);
        let names: Vec<_> = fs::read_dir(s.working_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["errorless.txt"]);
        assert_eq!(
            fs::read_to_string(s.working_dir().join("errorless.txt")).unwrap(),
            ""
        );
    }

    #[test]
    fn test_held_lock_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let _held = RunLock::acquire(&s.lock_path(), &s.date, Duration::from_secs(3600)).unwrap();
        let result = run(&s, None);
        assert!(matches!(result, Err(LogDigestError::Lock(_))));
        assert!(!s.working_dir().exists());
    }

    #[test]
    fn test_report_without_notifier_is_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("web");
        fs::create_dir(&web).unwrap();
        let lines: String = (0..11).map(|i| format!("ERROR {i}\n")).collect();
        fs::write(web.join("2024-01-01.log"), lines).unwrap();

        let outcome = run(&settings(dir.path()), None).unwrap();
        match outcome {
            RunOutcome::Reported {
                report_path,
                delivery,
            } => {
                assert_eq!(delivery, DeliveryStatus::Disabled);
                assert!(report_path.ends_with("2024-01-01/2024-01-01_report.json"));
                assert!(report_path.exists());
            }
            other => panic!("expected a report, got {other:?}"),
        }
    }
}
