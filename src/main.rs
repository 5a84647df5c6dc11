// LogDigest - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (explicit --config or platform default)
// 3. Logging initialisation (debug mode support)
// 4. Notifier construction (credentials checked before any work)
// 5. One pipeline run, mapped to the process exit code

use clap::Parser;
use logdigest::app::notify::{MailNotifier, Notifier};
use logdigest::app::pipeline::{self, RunOutcome, RunSettings};
use logdigest::core::model::KeywordSet;
use logdigest::platform::config::{self, AppConfig, PlatformPaths};
use logdigest::platform::secrets::EnvSecretProvider;
use logdigest::util::{self, constants};
use std::path::PathBuf;
use std::process::ExitCode;

/// LogDigest - daily log aggregation and error report.
///
/// Collects today's log files from every server directory under ROOT,
/// extracts lines matching the configured keywords, and mails a JSON report
/// when the day is noisy enough.
#[derive(Parser, Debug)]
#[command(name = "logdigest", version, about)]
struct Cli {
    /// Root log directory containing one subdirectory per server.
    /// Overrides [paths] root_dir.
    root: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Date to process (YYYY-MM-DD). Defaults to today.
    #[arg(long = "date")]
    date: Option<chrono::NaiveDate>,

    /// Report only when more than this many lines are classified.
    #[arg(short = 't', long = "threshold")]
    threshold: Option<usize>,

    /// Write artifacts but do not send the report.
    #[arg(long = "no-notify")]
    no_notify: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (app_config, config_warnings) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            util::logging::init(cli.debug, None, None);
            tracing::error!(error = %e, "Cannot load configuration");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    util::logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "LogDigest starting"
    );
    for w in &config_warnings {
        tracing::warn!(warning = %w, "Configuration warning");
    }

    let settings = RunSettings {
        root_dir: cli.root.clone().unwrap_or_else(|| app_config.root_dir.clone()),
        date: cli
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
            .format(constants::DATE_FORMAT)
            .to_string(),
        keywords: KeywordSet::new(&app_config.keywords),
        primary_keyword: app_config.primary_keyword.clone(),
        threshold: cli.threshold.unwrap_or(app_config.threshold),
    };

    let notifier = if cli.no_notify || !app_config.notify.enabled {
        tracing::info!("Report delivery disabled");
        None
    } else {
        match MailNotifier::from_config(&app_config.notify, &EnvSecretProvider) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::error!(error = %e, "Notification is enabled but not usable");
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let result = pipeline::run(&settings, notifier.as_ref().map(|n| n as &dyn Notifier));
    match result {
        Ok(outcome) => {
            match &outcome {
                RunOutcome::NoSourceFiles => {
                    println!("No log files found for {}.", settings.date);
                }
                RunOutcome::BelowThreshold {
                    classified,
                    threshold,
                } => {
                    println!(
                        "{classified} line(s) classified for {} (threshold {threshold}); no report.",
                        settings.date
                    );
                }
                RunOutcome::Reported {
                    report_path,
                    delivery,
                } => {
                    println!("Report written to {}", report_path.display());
                    println!("Delivery: {delivery:?}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Explicit `--config` must be readable; the platform default may be absent.
fn load_config(cli: &Cli) -> Result<(AppConfig, Vec<String>), logdigest::util::error::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config(path, true),
        None => config::load_config(&PlatformPaths::resolve().config_file(), false),
    }
}
