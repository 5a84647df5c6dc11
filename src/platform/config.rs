// LogDigest - platform/config.rs
//
// Platform configuration directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved platform paths for LogDigest configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logdigest/ or %APPDATA%\LogDigest\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[paths]` section.
    pub paths: PathsSection,
    /// `[analysis]` section.
    pub analysis: AnalysisSection,
    /// `[notify]` section.
    pub notify: NotifySection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[paths]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Root directory containing one subdirectory per server.
    pub root_dir: Option<String>,
}

/// `[analysis]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Ordered keyword list.
    pub keywords: Option<Vec<String>>,
    /// Keyword heading the report's critical list.
    pub primary_keyword: Option<String>,
    /// Classified-line count that must be exceeded to report.
    pub threshold: Option<i64>,
}

/// `[notify]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct NotifySection {
    pub enabled: Option<bool>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i64>,
    pub username: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    /// Name of the environment variable holding the SMTP password.
    pub password_env: Option<String>,
    pub max_attempts: Option<i64>,
    pub timeout_secs: Option<i64>,
    pub retry_delay_ms: Option<i64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Validated notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub password_env: String,
    pub max_attempts: u32,
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: constants::DEFAULT_SMTP_HOST.to_string(),
            smtp_port: constants::DEFAULT_SMTP_PORT,
            username: None,
            sender: None,
            recipient: None,
            password_env: constants::DEFAULT_PASSWORD_ENV.to_string(),
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
            timeout: Duration::from_secs(constants::DEFAULT_ATTEMPT_TIMEOUT_SECS),
            retry_delay: Duration::from_millis(constants::DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // -- Paths --
    pub root_dir: PathBuf,

    // -- Analysis --
    /// Lowercased, de-duplicated, never empty.
    pub keywords: Vec<String>,
    /// Always a member of `keywords`.
    pub primary_keyword: String,
    pub threshold: usize,

    // -- Notify --
    pub notify: NotifyConfig,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(constants::DEFAULT_ROOT_DIR),
            keywords: constants::DEFAULT_KEYWORDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            primary_keyword: constants::DEFAULT_PRIMARY_KEYWORD.to_string(),
            threshold: constants::DEFAULT_THRESHOLD,
            notify: NotifyConfig::default(),
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate a config file.
///
/// With `required == false` (the platform default location) a missing or
/// unreadable file yields defaults plus a warning, so a first run works
/// without any setup. With `required == true` (an explicit `--config`) the
/// same conditions are errors.
pub fn load_config(path: &Path, required: bool) -> Result<(AppConfig, Vec<String>), ConfigError> {
    if !required && !path.exists() {
        return Ok((
            AppConfig::default(),
            vec![format!(
                "No config file at '{}'; using defaults.",
                path.display()
            )],
        ));
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(source) if required => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                path.display()
            );
            return Ok((AppConfig::default(), vec![msg]));
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) if required => {
            return Err(ConfigError::TomlParse {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                path.display()
            );
            return Ok((AppConfig::default(), vec![msg]));
        }
    };

    Ok(validate(raw))
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();

    // -- Paths: root_dir --
    if let Some(root) = raw.paths.root_dir {
        if root.trim().is_empty() {
            warnings.push(format!(
                "[paths] root_dir is empty. Using default ({}).",
                constants::DEFAULT_ROOT_DIR
            ));
        } else {
            config.root_dir = PathBuf::from(root);
        }
    }

    // -- Analysis: keywords --
    if let Some(list) = raw.analysis.keywords {
        let mut keywords: Vec<String> = Vec::new();
        for k in &list {
            let k = k.trim().to_lowercase();
            if k.is_empty() {
                warnings.push("[analysis] keywords contains an empty entry; ignored.".to_string());
            } else if !keywords.contains(&k) {
                keywords.push(k);
            }
        }
        if keywords.is_empty() {
            warnings.push(format!(
                "[analysis] keywords is empty. Using default ({}).",
                constants::DEFAULT_KEYWORDS.join(", ")
            ));
        } else if keywords.len() > constants::MAX_KEYWORDS {
            warnings.push(format!(
                "[analysis] keywords has {} entries; only the first {} are used.",
                keywords.len(),
                constants::MAX_KEYWORDS
            ));
            keywords.truncate(constants::MAX_KEYWORDS);
            config.keywords = keywords;
        } else {
            config.keywords = keywords;
        }
    }

    // -- Analysis: primary_keyword --
    let primary = raw
        .analysis
        .primary_keyword
        .map(|p| p.trim().to_lowercase())
        .unwrap_or_else(|| constants::DEFAULT_PRIMARY_KEYWORD.to_string());
    if config.keywords.contains(&primary) {
        config.primary_keyword = primary;
    } else {
        // keywords is never empty at this point.
        let fallback = config.keywords[0].clone();
        warnings.push(format!(
            "[analysis] primary_keyword = \"{primary}\" is not in keywords. Using \"{fallback}\"."
        ));
        config.primary_keyword = fallback;
    }

    // -- Analysis: threshold --
    if let Some(t) = raw.analysis.threshold {
        match usize::try_from(t) {
            Ok(t) if t <= constants::ABSOLUTE_MAX_THRESHOLD => config.threshold = t,
            _ => warnings.push(format!(
                "[analysis] threshold = {t} is out of range (0-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_THRESHOLD,
                constants::DEFAULT_THRESHOLD,
            )),
        }
    }

    // -- Notify --
    let n = raw.notify;
    if let Some(enabled) = n.enabled {
        config.notify.enabled = enabled;
    }
    if let Some(host) = n.smtp_host.filter(|h| !h.trim().is_empty()) {
        config.notify.smtp_host = host;
    }
    if let Some(port) = n.smtp_port {
        match u16::try_from(port) {
            Ok(p) if p > 0 => config.notify.smtp_port = p,
            _ => warnings.push(format!(
                "[notify] smtp_port = {port} is out of range (1-65535). Using default ({}).",
                constants::DEFAULT_SMTP_PORT
            )),
        }
    }
    config.notify.username = n.username.filter(|s| !s.trim().is_empty());
    config.notify.sender = n.sender.filter(|s| !s.trim().is_empty());
    config.notify.recipient = n.recipient.filter(|s| !s.trim().is_empty());
    if let Some(var) = n.password_env.filter(|s| !s.trim().is_empty()) {
        config.notify.password_env = var;
    }
    if let Some(attempts) = n.max_attempts {
        match u32::try_from(attempts) {
            Ok(a) if (1..=constants::ABSOLUTE_MAX_ATTEMPTS).contains(&a) => {
                config.notify.max_attempts = a;
            }
            _ => warnings.push(format!(
                "[notify] max_attempts = {attempts} is out of range (1-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_ATTEMPTS,
                constants::DEFAULT_MAX_ATTEMPTS,
            )),
        }
    }
    if let Some(secs) = n.timeout_secs {
        match u64::try_from(secs) {
            Ok(s) if (1..=constants::MAX_ATTEMPT_TIMEOUT_SECS).contains(&s) => {
                config.notify.timeout = Duration::from_secs(s);
            }
            _ => warnings.push(format!(
                "[notify] timeout_secs = {secs} is out of range (1-{}). Using default ({}).",
                constants::MAX_ATTEMPT_TIMEOUT_SECS,
                constants::DEFAULT_ATTEMPT_TIMEOUT_SECS,
            )),
        }
    }
    if let Some(ms) = n.retry_delay_ms {
        match u64::try_from(ms) {
            Ok(m) if m <= constants::MAX_RETRY_DELAY_MS => {
                config.notify.retry_delay = Duration::from_millis(m);
            }
            _ => warnings.push(format!(
                "[notify] retry_delay_ms = {ms} is out of range (0-{}). Using default ({}).",
                constants::MAX_RETRY_DELAY_MS,
                constants::DEFAULT_RETRY_DELAY_MS,
            )),
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(PathBuf::from(file));
        }
    }

    (config, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> (AppConfig, Vec<String>) {
        validate(toml::from_str(toml_text).expect("valid toml"))
    }

    #[test]
    fn test_empty_config_is_defaults() {
        let (config, warnings) = parse("");
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_full_config() {
        let (config, warnings) = parse(
            r#"
            [paths]
            root_dir = "/srv/logs"

            [analysis]
            keywords = ["Error", "Timeout", "error"]
            primary_keyword = "ERROR"
            threshold = 3

            [notify]
            enabled = false
            smtp_host = "mail.example.com"
            smtp_port = 2525
            recipient = "ops@example.com"
            max_attempts = 5
            timeout_secs = 30
            retry_delay_ms = 0

            [logging]
            level = "DEBUG"
            file = "/tmp/logdigest.log"
            "#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.root_dir, PathBuf::from("/srv/logs"));
        assert_eq!(config.keywords, vec!["error", "timeout"]);
        assert_eq!(config.primary_keyword, "error");
        assert_eq!(config.threshold, 3);
        assert!(!config.notify.enabled);
        assert_eq!(config.notify.smtp_port, 2525);
        assert_eq!(config.notify.max_attempts, 5);
        assert_eq!(config.notify.timeout, Duration::from_secs(30));
        assert_eq!(config.notify.retry_delay, Duration::ZERO);
        assert_eq!(config.notify.recipient.as_deref(), Some("ops@example.com"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_fall_back_with_warnings() {
        let (config, warnings) = parse(
            r#"
            [analysis]
            threshold = -1
            [notify]
            smtp_port = 70000
            max_attempts = 0
            timeout_secs = 9999
            [logging]
            level = "loud"
            "#,
        );
        assert_eq!(config.threshold, constants::DEFAULT_THRESHOLD);
        assert_eq!(config.notify.smtp_port, constants::DEFAULT_SMTP_PORT);
        assert_eq!(config.notify.max_attempts, constants::DEFAULT_MAX_ATTEMPTS);
        assert_eq!(warnings.len(), 5, "{warnings:?}");
    }

    #[test]
    fn test_primary_keyword_must_be_in_set() {
        let (config, warnings) = parse(
            r#"
            [analysis]
            keywords = ["fatal", "panic"]
            "#,
        );
        assert_eq!(config.primary_keyword, "fatal");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_empty_keywords_fall_back_to_defaults() {
        let (config, warnings) = parse("[analysis]\nkeywords = [\"  \"]\n");
        assert_eq!(config.keywords.len(), constants::DEFAULT_KEYWORDS.len());
        assert_eq!(warnings.len(), 2, "{warnings:?}");
    }

    #[test]
    fn test_missing_optional_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"), false).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_missing_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(&dir.path().join("config.toml"), true);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_unparseable_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis\nthreshold = ").unwrap();
        assert!(matches!(
            load_config(&path, true),
            Err(ConfigError::TomlParse { .. })
        ));
        let (config, warnings) = load_config(&path, false).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
    }
}
