// LogDigest - core/model.rs
//
// Core data model types. Pure data definitions with no I/O.
//
// These types are the shared vocabulary across all layers.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Sources and staging
// =============================================================================

/// A today-dated log file found inside one server directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Name of the server directory the file was found in.
    pub server: String,

    /// Absolute path of the original file.
    pub path: PathBuf,

    /// Original filename (UTF-8).
    pub file_name: String,
}

/// A copy of one source file inside the per-date working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Origin server name.
    pub server: String,

    /// Filename of the original source file.
    pub original_name: String,

    /// Path of the copy inside the working directory.
    pub staged_path: PathBuf,
}

/// Staged path -> origin server, for O(1) provenance lookup during
/// classification.
pub type Provenance = HashMap<PathBuf, String>;

// =============================================================================
// Keywords
// =============================================================================

/// Ordered, lowercased keyword set matched as case-insensitive substrings.
///
/// Order is significant: it fixes the key order of the tally and of the
/// report's `keyword_counts` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Build a keyword set, lowercasing and trimming each entry.
    /// Empty entries and duplicates (after lowercasing) are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for k in keywords {
            let k = k.as_ref().trim().to_lowercase();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        Self { keywords: out }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Position of `keyword` (case-insensitive) in the set.
    pub fn position(&self, keyword: &str) -> Option<usize> {
        let k = keyword.to_lowercase();
        self.keywords.iter().position(|existing| *existing == k)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.position(keyword).is_some()
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(crate::util::constants::DEFAULT_KEYWORDS)
    }
}

// =============================================================================
// Classification output
// =============================================================================

/// One log line that matched at least one keyword, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// Server directory the line came from.
    pub server: String,

    /// Line text with surrounding whitespace trimmed.
    pub text: String,

    /// Matched keywords, in keyword-set order. Never empty.
    pub matched: Vec<String>,
}

impl ClassifiedLine {
    /// True if `keyword` (lowercase) is in this line's match set.
    pub fn matches(&self, keyword: &str) -> bool {
        self.matched.iter().any(|k| k == keyword)
    }
}

/// Rendered as `<server>: <line>`, the format of the classified-lines
/// artifact and of the report's critical list.
impl fmt::Display for ClassifiedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.server, self.text)
    }
}

/// Per-keyword occurrence counts.
///
/// Keys are fixed at construction to the keyword set, in order; counts start
/// at zero and can only be incremented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTally {
    entries: Vec<(String, u64)>,
}

impl KeywordTally {
    pub fn new(keywords: &KeywordSet) -> Self {
        Self {
            entries: keywords.iter().map(|k| (k.to_string(), 0)).collect(),
        }
    }

    /// Increment the counter at `index` (keyword-set position).
    /// Out-of-range indices are ignored.
    pub fn increment(&mut self, index: usize) {
        if let Some((_, count)) = self.entries.get_mut(index) {
            *count += 1;
        }
    }

    /// Count for `keyword`; zero for keywords outside the set.
    pub fn get(&self, keyword: &str) -> u64 {
        let k = keyword.to_lowercase();
        self.entries
            .iter()
            .find(|(name, _)| *name == k)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    /// Sum of all counters (a line matching two keywords counts twice).
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// `error: 3, warning: 0, ...` for log output.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(k, c)| format!("{k}: {c}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Serialised as a JSON object preserving keyword order.
impl Serialize for KeywordTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (keyword, count) in &self.entries {
            map.serialize_entry(keyword, count)?;
        }
        map.end()
    }
}

/// Everything the classify stage hands forward.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Classified lines in file-then-line order.
    pub lines: Vec<ClassifiedLine>,

    /// Final keyword tally.
    pub tally: KeywordTally,

    /// Number of staged files that were read successfully.
    pub files_read: usize,
}

// =============================================================================
// Report
// =============================================================================

/// The structured daily report, persisted as `<date>_report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Date the report covers (`YYYY-MM-DD`).
    pub report_date: String,

    /// Number of source files staged for the run.
    pub total_files_processed: usize,

    /// Full keyword tally.
    pub keyword_counts: KeywordTally,

    /// Lines matching the primary keyword.
    #[serde(rename = "critical_errors", serialize_with = "serialize_lines")]
    pub critical_lines: Vec<ClassifiedLine>,
}

fn serialize_lines<S: Serializer>(lines: &[ClassifiedLine], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(lines.len()))?;
    for line in lines {
        seq.serialize_element(&line.to_string())?;
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_set_normalises_and_dedups() {
        let set = KeywordSet::new(["Error", " warning ", "", "ERROR", "critical"]);
        let keys: Vec<_> = set.iter().collect();
        assert_eq!(keys, vec!["error", "warning", "critical"]);
        assert_eq!(set.position("WARNING"), Some(1));
        assert!(!set.contains("failure"));
    }

    #[test]
    fn test_tally_starts_at_zero_with_fixed_keys() {
        let set = KeywordSet::default();
        let mut tally = KeywordTally::new(&set);
        assert_eq!(tally.total(), 0);
        tally.increment(0);
        tally.increment(0);
        tally.increment(99);
        assert_eq!(tally.get("error"), 2);
        assert_eq!(tally.get("unknown"), 0);
        assert_eq!(tally.iter().count(), set.len());
    }

    #[test]
    fn test_tally_serialises_in_keyword_order() {
        let set = KeywordSet::new(["warning", "error"]);
        let mut tally = KeywordTally::new(&set);
        tally.increment(1);
        let json = serde_json::to_string(&tally).unwrap();
        assert_eq!(json, r#"{"warning":0,"error":1}"#);
    }

    #[test]
    fn test_classified_line_display() {
        let line = ClassifiedLine {
            server: "web01".to_string(),
            text: "ERROR disk full".to_string(),
            matched: vec!["error".to_string()],
        };
        assert_eq!(line.to_string(), "web01: ERROR disk full");
        assert!(line.matches("error"));
        assert!(!line.matches("warning"));
    }

    #[test]
    fn test_report_schema_field_names() {
        let set = KeywordSet::default();
        let report = Report {
            report_date: "2024-01-01".to_string(),
            total_files_processed: 2,
            keyword_counts: KeywordTally::new(&set),
            critical_lines: vec![ClassifiedLine {
                server: "A".to_string(),
                text: "ERROR x".to_string(),
                matched: vec!["error".to_string()],
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["report_date"], "2024-01-01");
        assert_eq!(value["total_files_processed"], 2);
        assert_eq!(value["keyword_counts"]["failure"], 0);
        assert_eq!(value["critical_errors"][0], "A: ERROR x");
    }
}
