// LogDigest - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Config validation clamps against the bounds declared here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogDigest";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogDigest";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Filesystem layout
// =============================================================================

/// Default root directory holding one subdirectory per server.
#[cfg(windows)]
pub const DEFAULT_ROOT_DIR: &str = "C:\\Logs";

/// Default root directory holding one subdirectory per server.
#[cfg(not(windows))]
pub const DEFAULT_ROOT_DIR: &str = "/var/log/servers";

/// Date format used for the working directory name and for matching
/// today's files inside each server directory.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// File extensions (lowercase, without the dot) accepted as log sources.
pub const SOURCE_EXTENSIONS: &[&str] = &["log", "txt"];

/// Name of the classified-lines artifact inside the working directory.
pub const CLASSIFIED_FILE_NAME: &str = "errorless.txt";

/// Suffix of the transient merged scratch file: `<date>_error.txt`.
pub const MERGED_SCRATCH_SUFFIX: &str = "_error.txt";

/// Suffix of the persisted report: `<date>_report.json`.
pub const REPORT_FILE_SUFFIX: &str = "_report.json";

/// Extension of the run lock sentinel written next to the working directory.
pub const LOCK_FILE_EXTENSION: &str = "lock";

/// Server name used when a staged file has no provenance entry.
pub const UNKNOWN_SERVER: &str = "Unknown";

/// Separator between server name and original filename in staged copies.
pub const STAGED_NAME_SEPARATOR: &str = "_";

/// Maximum number of numeric suffixes tried when a staged name collides.
pub const MAX_STAGED_NAME_SUFFIX: usize = 1_000;

// =============================================================================
// Classification
// =============================================================================

/// Default ordered keyword set (matched case-insensitively as substrings).
pub const DEFAULT_KEYWORDS: &[&str] = &["error", "warning", "critical", "failure"];

/// Keyword whose matches form the report's critical subset and whose count
/// headlines the notification.
pub const DEFAULT_PRIMARY_KEYWORD: &str = "error";

/// Maximum number of keywords accepted from configuration.
pub const MAX_KEYWORDS: usize = 64;

/// Classified-line count that must be exceeded before a report is persisted.
pub const DEFAULT_THRESHOLD: usize = 10;

/// Hard upper bound on the configurable threshold.
pub const ABSOLUTE_MAX_THRESHOLD: usize = 1_000_000;

/// Indentation used when pretty-printing the JSON report.
pub const REPORT_JSON_INDENT: &[u8] = b"    ";

// =============================================================================
// Notification
// =============================================================================

/// Default SMTP relay host.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Environment variable read for the SMTP password unless overridden.
pub const DEFAULT_PASSWORD_ENV: &str = "LOGDIGEST_SMTP_PASSWORD";

/// Default number of delivery attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Hard upper bound on delivery attempts.
pub const ABSOLUTE_MAX_ATTEMPTS: u32 = 10;

/// Default per-attempt transport timeout (seconds).
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Maximum configurable per-attempt timeout (seconds).
pub const MAX_ATTEMPT_TIMEOUT_SECS: u64 = 300;

/// Default pause between delivery attempts (ms).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Maximum configurable pause between delivery attempts (ms).
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// SMTP reply codes that signal rejected credentials.
pub const SMTP_AUTH_FAILURE_CODES: &[&str] = &["530", "534", "535"];

/// MIME type of the report attachment.
pub const REPORT_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// Run lock
// =============================================================================

/// Age after which a lock sentinel is considered abandoned (seconds).
pub const LOCK_STALE_AFTER_SECS: u64 = 6 * 60 * 60;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
