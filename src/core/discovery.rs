// LogDigest - core/discovery.rs
//
// Source tree scanning: finds today's log files inside each per-server
// subdirectory of the root log directory.
//
// Architecture note: this module uses `walkdir` for traversal and `glob` for
// filename matching. It reads only directory entries, never file contents;
// copying into the working directory is owned by app::staging.
//
// Error policy:
//   - A missing or non-directory root is fatal (nothing to aggregate).
//   - Per-entry access errors are non-fatal and collected as warnings.

use crate::core::model::SourceFile;
use crate::util::constants;
use crate::util::error::DiscoveryError;
use glob::{MatchOptions, Pattern};
use std::ffi::OsStr;
use std::io;
use std::path::Path;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for one scan of the source tree.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Date string that a source filename must contain (e.g. `2024-01-01`).
    /// Also the name of the working directory, which is never scanned.
    pub date: String,

    /// Accepted extensions, lowercase without the dot.
    pub extensions: Vec<String>,
}

impl DiscoveryConfig {
    pub fn for_date(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            extensions: constants::SOURCE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// One `*<date>*.<ext>` pattern per accepted extension. The date is
    /// escaped so it is always matched literally.
    fn patterns(&self) -> Vec<Pattern> {
        let date = Pattern::escape(&self.date);
        self.extensions
            .iter()
            .filter_map(|ext| {
                let raw = format!("*{date}*.{}", Pattern::escape(ext));
                match Pattern::new(&raw) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::warn!(pattern = %raw, error = %e, "Invalid source pattern, skipping");
                        None
                    }
                }
            })
            .collect()
    }
}

// =============================================================================
// Root validation
// =============================================================================

/// Check that `root` exists and is a directory.
///
/// Uses `fs::metadata()` rather than `Path::is_dir()` so that a permission
/// problem is reported as such instead of as a missing directory.
pub fn validate_root(root: &Path) -> Result<(), DiscoveryError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DiscoveryError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Err(DiscoveryError::PermissionDenied {
                path: root.to_path_buf(),
                source: e,
            })
        }
        Err(_) => Err(DiscoveryError::RootNotFound {
            path: root.to_path_buf(),
        }),
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Find every today-dated source file under `root`.
///
/// Only immediate subdirectories of `root` are treated as servers, and only
/// files directly inside them are considered. The working directory
/// (`root/<date>`) is skipped. Entries are visited in filename order.
///
/// Returns the matching files and a list of human-readable warnings for
/// entries that could not be accessed. An empty file list is a valid result.
pub fn discover_sources(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<(Vec<SourceFile>, Vec<String>), DiscoveryError> {
    validate_root(root)?;

    let patterns = config.patterns();
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let working_dir_name = OsStr::new(&config.date);

    tracing::debug!(
        root = %root.display(),
        date = %config.date,
        extensions = ?config.extensions,
        "Source scan starting"
    );

    let mut files: Vec<SourceFile> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    // Depth 1 = server directories, depth 2 = their files. Plain files at
    // depth 1 and the working directory are pruned by filter_entry.
    // Links are followed so a symlinked server directory is scanned like a
    // real one; max_depth bounds the walk and walkdir reports link loops.
    let walker = walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() != 1 || (e.file_type().is_dir() && e.file_name() != working_dir_name)
        });

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            // The root itself could not be listed: nothing can be scanned.
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::Traversal {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        if entry.depth() == 1 {
            tracing::debug!(server = %entry.path().display(), "Checking server directory");
            continue;
        }

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => {
                warnings.push(format!("Skipping '{}': non-UTF-8 filename", path.display()));
                continue;
            }
        };

        if !patterns.iter().any(|p| p.matches_with(file_name, options)) {
            tracing::trace!(file = file_name, "Not a today-dated source file");
            continue;
        }

        let server = match path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
        {
            Some(s) => s.to_string(),
            None => {
                warnings.push(format!(
                    "Skipping '{}': non-UTF-8 server directory name",
                    path.display()
                ));
                continue;
            }
        };

        files.push(SourceFile {
            server,
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
        });
    }

    tracing::debug!(
        files = files.len(),
        warnings = warnings.len(),
        "Source scan complete"
    );

    Ok((files, warnings))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DATE: &str = "2024-01-01";

    fn make_temp_tree() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        let web = root.join("web01");
        fs::create_dir(&web).expect("mkdir web01");
        fs::write(web.join("2024-01-01.log"), "ERROR one\n").expect("write log");
        fs::write(web.join("2023-12-31.log"), "old\n").expect("write old log");
        fs::write(web.join("2024-01-01.gz"), "binary").expect("write gz");

        let db = root.join("db01");
        fs::create_dir(&db).expect("mkdir db01");
        fs::write(db.join("app-2024-01-01.TXT"), "WARNING two\n").expect("write txt");

        // Nested deeper than one level: ignored.
        let nested = db.join("archive");
        fs::create_dir(&nested).expect("mkdir archive");
        fs::write(nested.join("2024-01-01.log"), "nested\n").expect("write nested");

        // Plain file in the root: not a server.
        fs::write(root.join("2024-01-01.log"), "root file\n").expect("write root file");

        // Working directory with a leftover copy: never scanned.
        let work = root.join(DATE);
        fs::create_dir(&work).expect("mkdir work");
        fs::write(work.join("web01_2024-01-01.log"), "stale\n").expect("write stale");

        dir
    }

    #[test]
    fn test_discovers_today_files_per_server() {
        let dir = make_temp_tree();
        let (files, warnings) =
            discover_sources(dir.path(), &DiscoveryConfig::for_date(DATE)).unwrap();

        let found: Vec<(String, String)> = files
            .iter()
            .map(|f| (f.server.clone(), f.file_name.clone()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("db01".to_string(), "app-2024-01-01.TXT".to_string()),
                ("web01".to_string(), "2024-01-01.log".to_string()),
            ],
            "expected only today's .log/.txt files, in name order"
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_no_matching_files_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("srv")).unwrap();
        fs::write(dir.path().join("srv").join("other.log"), "x").unwrap();
        let (files, _) = discover_sources(dir.path(), &DiscoveryConfig::for_date(DATE)).unwrap();
        assert!(files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_server_directory_is_scanned() {
        let target = tempfile::tempdir().unwrap();
        fs::write(target.path().join("2024-01-01.log"), "ERROR via symlink\n").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(target.path(), dir.path().join("linked")).unwrap();

        let (files, warnings) =
            discover_sources(dir.path(), &DiscoveryConfig::for_date(DATE)).unwrap();

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].server, "linked");
        assert_eq!(files[0].path, dir.path().join("linked").join("2024-01-01.log"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_log_file_is_picked_up() {
        let target = tempfile::tempdir().unwrap();
        let real = target.path().join("real.log");
        fs::write(&real, "warning\n").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let srv = dir.path().join("srv");
        fs::create_dir(&srv).unwrap();
        std::os::unix::fs::symlink(&real, srv.join("2024-01-01.log")).unwrap();

        let (files, _) = discover_sources(dir.path(), &DiscoveryConfig::for_date(DATE)).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].server, "srv");
    }

    #[test]
    fn test_date_is_matched_literally() {
        let dir = tempfile::tempdir().unwrap();
        let srv = dir.path().join("srv");
        fs::create_dir(&srv).unwrap();
        fs::write(srv.join("x[1].log"), "x").unwrap();
        let (files, _) = discover_sources(dir.path(), &DiscoveryConfig::for_date("[1]")).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_root_not_found() {
        let result = discover_sources(
            Path::new("/nonexistent/path/logdigest"),
            &DiscoveryConfig::for_date(DATE),
        );
        assert!(matches!(result, Err(DiscoveryError::RootNotFound { .. })));
    }

    #[test]
    fn test_root_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir.log");
        fs::write(&file, "content").unwrap();
        let result = discover_sources(&file, &DiscoveryConfig::for_date(DATE));
        assert!(matches!(result, Err(DiscoveryError::NotADirectory { .. })));
    }
}
