// LogDigest - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every variant carries the path or setting it concerns so a single log
// line is enough to act on.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogDigest operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogDigestError {
    /// Source tree scanning failed.
    Discovery(DiscoveryError),

    /// Staging or merging into the working directory failed.
    Staging(StagingError),

    /// Writing a persisted artifact (classified lines, report) failed.
    Artifact(ArtifactError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Report delivery could not proceed.
    Notify(NotifyError),

    /// The per-date run lock could not be acquired.
    Lock(LockError),
}

impl fmt::Display for LogDigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Staging(e) => write!(f, "Staging error: {e}"),
            Self::Artifact(e) => write!(f, "Artifact error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Notify(e) => write!(f, "Notification error: {e}"),
            Self::Lock(e) => write!(f, "Run lock error: {e}"),
        }
    }
}

impl std::error::Error for LogDigestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Discovery(e) => Some(e),
            Self::Staging(e) => Some(e),
            Self::Artifact(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Notify(e) => Some(e),
            Self::Lock(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors raised while scanning the source tree.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root log directory does not exist.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the root path.
    PermissionDenied { path: PathBuf, source: io::Error },

    /// Walkdir traversal error on the root itself.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Log directory '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Log directory '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for LogDigestError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Staging errors
// ---------------------------------------------------------------------------

/// Errors raised while preparing the working directory or merging into it.
#[derive(Debug)]
pub enum StagingError {
    /// The per-date working directory could not be created.
    CreateWorkingDir { path: PathBuf, source: io::Error },

    /// The working directory could not be listed while clearing stale state.
    ListWorkingDir { path: PathBuf, source: io::Error },

    /// No free staged name could be found for a source file.
    NameExhausted { server: String, file_name: String },

    /// The merged scratch file could not be written.
    MergeScratch { path: PathBuf, source: io::Error },
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateWorkingDir { path, source } => write!(
                f,
                "Cannot create working directory '{}': {source}",
                path.display()
            ),
            Self::ListWorkingDir { path, source } => write!(
                f,
                "Cannot list working directory '{}': {source}",
                path.display()
            ),
            Self::NameExhausted { server, file_name } => write!(
                f,
                "No free staged name for '{file_name}' from server '{server}'"
            ),
            Self::MergeScratch { path, source } => write!(
                f,
                "Cannot write merged scratch file '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for StagingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateWorkingDir { source, .. } => Some(source),
            Self::ListWorkingDir { source, .. } => Some(source),
            Self::MergeScratch { source, .. } => Some(source),
            Self::NameExhausted { .. } => None,
        }
    }
}

impl From<StagingError> for LogDigestError {
    fn from(e: StagingError) -> Self {
        Self::Staging(e)
    }
}

// ---------------------------------------------------------------------------
// Artifact errors
// ---------------------------------------------------------------------------

/// Errors related to persisting run artifacts.
#[derive(Debug)]
pub enum ArtifactError {
    /// I/O error writing the artifact.
    Io { path: PathBuf, source: io::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Cannot write '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON serialisation error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ArtifactError> for LogDigestError {
    fn from(e: ArtifactError) -> Self {
        Self::Artifact(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for LogDigestError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Notify errors
// ---------------------------------------------------------------------------

/// Fatal notification errors. Transient transport failures are not errors at
/// this level; they surface as a failed delivery in the run outcome.
#[derive(Debug)]
pub enum NotifyError {
    /// No password could be obtained from the secret provider.
    MissingCredentials { variable: String },

    /// Delivery is enabled but a required address is not configured.
    MissingAddress { field: &'static str },

    /// The mail server rejected the configured credentials.
    AuthenticationRejected { attempts: u32, reason: String },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials { variable } => write!(
                f,
                "SMTP password not available: environment variable '{variable}' is unset or empty"
            ),
            Self::MissingAddress { field } => {
                write!(f, "[notify] {field} must be set when notification is enabled")
            }
            Self::AuthenticationRejected { attempts, reason } => write!(
                f,
                "SMTP authentication failed on attempt {attempts}: {reason}. \
                 Check the username and app password."
            ),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<NotifyError> for LogDigestError {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

// ---------------------------------------------------------------------------
// Lock errors
// ---------------------------------------------------------------------------

/// Errors related to the per-date run lock.
#[derive(Debug)]
pub enum LockError {
    /// Another live run holds the lock for this date.
    Held {
        path: PathBuf,
        pid: u32,
        hostname: String,
    },

    /// I/O error reading, writing or removing the sentinel.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Held {
                path,
                pid,
                hostname,
            } => write!(
                f,
                "'{}' is held by PID {pid} on '{hostname}'; another run for this date is in progress",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Lock I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Held { .. } => None,
        }
    }
}

impl From<LockError> for LogDigestError {
    fn from(e: LockError) -> Self {
        Self::Lock(e)
    }
}

/// Convenience type alias for LogDigest results.
pub type Result<T> = std::result::Result<T, LogDigestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_includes_path() {
        let err = LogDigestError::from(DiscoveryError::RootNotFound {
            path: PathBuf::from("/missing/logs"),
        });
        let text = err.to_string();
        assert!(text.contains("/missing/logs"), "got: {text}");
        assert!(text.starts_with("Discovery error"));
    }

    #[test]
    fn test_source_chain_preserved() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = LogDigestError::from(StagingError::CreateWorkingDir {
            path: PathBuf::from("/logs/2024-01-01"),
            source: io_err,
        });
        let staging = err.source().expect("staging source");
        assert!(staging.source().is_some(), "io::Error should be chained");
    }

    #[test]
    fn test_missing_credentials_names_variable() {
        let err = NotifyError::MissingCredentials {
            variable: "SMTP_PASS".to_string(),
        };
        assert!(err.to_string().contains("SMTP_PASS"));
    }
}
