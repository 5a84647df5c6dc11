// LogDigest - core/classify.rs
//
// Keyword classification of log lines.
// Core layer: pure logic over strings, no I/O. The app layer feeds file
// contents in staged-path order; this module preserves that order.
//
// Matching is case-insensitive substring matching: "error" matches
// "ERRORCODE". Overlapping keywords each count: a line containing both
// "error" and "critical" increments both counters.

use crate::core::model::{Classification, ClassifiedLine, KeywordSet, KeywordTally};
use crate::util::constants;

/// Indices (keyword-set positions) of every keyword found in `line`.
///
/// The line is lowercased once; each keyword is then tested as a substring.
pub fn match_keywords(keywords: &KeywordSet, line: &str) -> Vec<usize> {
    let lower = line.to_lowercase();
    keywords
        .iter()
        .enumerate()
        .filter(|(_, k)| lower.contains(k))
        .map(|(i, _)| i)
        .collect()
}

/// First `DEBUG_MAX_LINE_PREVIEW` characters of `line`, for trace output.
fn preview(line: &str) -> &str {
    match line.char_indices().nth(constants::DEBUG_MAX_LINE_PREVIEW) {
        Some((end, _)) => &line[..end],
        None => line,
    }
}

/// Accumulates classified lines and the keyword tally across files.
#[derive(Debug)]
pub struct Classifier<'a> {
    keywords: &'a KeywordSet,
    lines: Vec<ClassifiedLine>,
    tally: KeywordTally,
    files_read: usize,
}

impl<'a> Classifier<'a> {
    pub fn new(keywords: &'a KeywordSet) -> Self {
        Self {
            keywords,
            lines: Vec::new(),
            tally: KeywordTally::new(keywords),
            files_read: 0,
        }
    }

    /// Classify a single line from `server`. Returns true if it matched.
    pub fn classify_line(&mut self, server: &str, line: &str) -> bool {
        let hits = match_keywords(self.keywords, line);
        if hits.is_empty() {
            return false;
        }

        let mut matched = Vec::with_capacity(hits.len());
        for &i in &hits {
            self.tally.increment(i);
            if let Some(k) = self.keywords.iter().nth(i) {
                matched.push(k.to_string());
            }
        }

        tracing::trace!(server, line = preview(line), keywords = ?matched, "Line classified");

        self.lines.push(ClassifiedLine {
            server: server.to_string(),
            text: line.trim().to_string(),
            matched,
        });
        true
    }

    /// Classify every line of one file's content. Returns the number of
    /// lines that matched.
    pub fn classify_content(&mut self, server: &str, content: &str) -> usize {
        let mut matched = 0;
        for line in content.lines() {
            if self.classify_line(server, line) {
                matched += 1;
            }
        }
        self.files_read += 1;
        matched
    }

    /// Lines classified so far.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn finish(self) -> Classification {
        Classification {
            lines: self.lines,
            tally: self.tally,
            files_read: self.files_read,
        }
    }
}
