// LogDigest - core/report.rs
//
// Report building and artifact rendering.
// Core layer: produces bytes; persisting them is owned by the app layer.
//
// The significance threshold is a noise-suppression policy: a day with at
// most `threshold` classified lines yields no report and no notification.

use crate::core::model::{Classification, ClassifiedLine, Report};
use crate::util::constants;
use serde::Serialize;

/// Inputs of the report decision that are not part of the classification.
#[derive(Debug, Clone)]
pub struct ReportParams<'a> {
    /// Date the run covers (`YYYY-MM-DD`).
    pub date: &'a str,

    /// Number of source files staged for the run.
    pub files_processed: usize,

    /// Keyword whose matches form the critical subset.
    pub primary_keyword: &'a str,

    /// A report is produced only when the classified-line count is strictly
    /// greater than this value.
    pub threshold: usize,
}

/// Outcome of the significance check.
#[derive(Debug, Clone)]
pub enum ReportDecision {
    /// Above threshold: this report should be persisted and delivered.
    Produced(Report),

    /// At or below threshold: nothing is persisted.
    BelowThreshold { classified: usize, threshold: usize },
}

/// Apply the significance threshold and, when exceeded, build the report.
pub fn build_report(classification: &Classification, params: &ReportParams<'_>) -> ReportDecision {
    let classified = classification.lines.len();
    if classified <= params.threshold {
        return ReportDecision::BelowThreshold {
            classified,
            threshold: params.threshold,
        };
    }

    let primary = params.primary_keyword.to_lowercase();
    let critical_lines: Vec<ClassifiedLine> = classification
        .lines
        .iter()
        .filter(|l| l.matches(&primary))
        .cloned()
        .collect();

    ReportDecision::Produced(Report {
        report_date: params.date.to_string(),
        total_files_processed: params.files_processed,
        keyword_counts: classification.tally.clone(),
        critical_lines,
    })
}

/// Render the classified-lines artifact: one `<server>: <line>` per line,
/// each terminated by `\n`.
pub fn render_classified_lines(lines: &[ClassifiedLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}

/// Render the report as pretty-printed JSON with 4-space indentation.
/// Non-ASCII text is written as UTF-8, not escaped.
pub fn render_report_json(report: &Report) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(constants::REPORT_JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut ser)?;
    Ok(buf)
}

/// `<date>_report.json`
pub fn report_file_name(date: &str) -> String {
    format!("{date}{}", constants::REPORT_FILE_SUFFIX)
}

/// `<date>_error.txt`
pub fn merged_scratch_name(date: &str) -> String {
    format!("{date}{}", constants::MERGED_SCRATCH_SUFFIX)
}
