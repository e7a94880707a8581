//! Tracing setup for tdmasat
//!
//! The console shows simulator events from the tdmasat crates at the chosen
//! level. A run log on disk keeps the per-second step trace of the engine so a
//! run can be replayed from its seed and compared line by line.

use std::fs::{File, create_dir_all};
use std::io;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the run log, overwritten on every run.
pub const LAST_RUN_LOG: &str = "tdmasat-last-run.log";

/// Crates whose events reach the console at the chosen level.
const SIMULATOR_TARGETS: [&str; 3] = ["tdmasat", "tdmasat_core", "tdmasat_sim"];

/// Failures while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("cannot create log directory {}: {source}", .path.display())]
    LogDirectory { path: PathBuf, source: io::Error },

    #[error("cannot create run log {}: {source}", .path.display())]
    RunLog { path: PathBuf, source: io::Error },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] TryInitError),
}

/// Where and how verbosely a simulation run is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Level of simulator events on the console
    pub console_level: Level,
    /// Level of the run log; `TRACE` records every simulated second
    pub run_log_level: Level,
    pub logs_dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            console_level: Level::WARN,
            run_log_level: Level::TRACE,
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl LogSettings {
    /// Settings for the given console level, run log in `./logs`.
    pub fn new(console_level: Level) -> Self {
        Self {
            console_level,
            ..Self::default()
        }
    }

    /// Writes the run log to `logs_dir` instead of `./logs`.
    pub fn with_logs_dir(mut self, logs_dir: Option<&Path>) -> Self {
        if let Some(dir) = logs_dir {
            self.logs_dir = dir.to_path_buf();
        }
        self
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.logs_dir.join(LAST_RUN_LOG)
    }

    /// Console directives: simulator crates at the chosen level, anything
    /// else only when it warns.
    pub fn console_directives(&self) -> String {
        let level = self.console_level.as_str().to_lowercase();
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            SIMULATOR_TARGETS
                .iter()
                .map(|target| format!("{target}={level}")),
        );
        directives.join(",")
    }
}

/// Installs the console and run log layers.
///
/// `RUST_LOG`, when set, replaces the console directives. Returns the path of
/// the run log.
///
/// # Errors
/// - `TracingError::LogDirectory` - Logs directory cannot be created
/// - `TracingError::RunLog` - Run log file cannot be created
/// - `TracingError::AlreadyInstalled` - Another global subscriber exists
pub fn init_tracing(settings: &LogSettings) -> Result<PathBuf, TracingError> {
    create_dir_all(&settings.logs_dir).map_err(|source| TracingError::LogDirectory {
        path: settings.logs_dir.clone(),
        source,
    })?;

    let run_log_path = settings.run_log_path();
    let run_log = File::create(&run_log_path).map_err(|source| TracingError::RunLog {
        path: run_log_path.clone(),
        source,
    })?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.console_directives()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    let run_log_filter = EnvFilter::new(settings.run_log_level.as_str().to_lowercase());
    let run_log_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(run_log)
        .with_filter(run_log_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(run_log_layer)
        .try_init()?;

    tracing::info!(
        console = %settings.console_level,
        run_log = %run_log_path.display(),
        "tdmasat logging ready"
    );

    Ok(run_log_path)
}

/// Console verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Setup failures only
    Error,
    /// Invariant violations and setup failures
    Warn,
    /// Driver start and run summary
    Info,
    /// Every relayed packet
    Debug,
    /// Every simulated second
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use tdmasat_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Info.as_tracing_level();
    /// assert_eq!(level, tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_tracing_level().as_str().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(CliLogLevel::Error.as_tracing_level(), Level::ERROR);
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
        assert_eq!(CliLogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_console_directives_scope_simulator_crates() {
        let settings = LogSettings::new(Level::DEBUG);

        assert_eq!(
            settings.console_directives(),
            "warn,tdmasat=debug,tdmasat_core=debug,tdmasat_sim=debug"
        );
        assert_eq!(settings.run_log_level, Level::TRACE);
        assert_eq!(settings.run_log_path(), Path::new("logs").join(LAST_RUN_LOG));

        let moved = settings.with_logs_dir(Some(Path::new("/tmp/runs")));
        assert_eq!(moved.run_log_path(), Path::new("/tmp/runs").join(LAST_RUN_LOG));
        assert_eq!(moved.clone().with_logs_dir(None), moved);
    }

    #[test]
    fn test_init_tracing_creates_run_log() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let settings = LogSettings::new(Level::WARN).with_logs_dir(Some(logs.as_path()));

        let path = init_tracing(&settings).unwrap();

        assert_eq!(path, logs.join(LAST_RUN_LOG));
        assert!(path.exists());
        // A second global subscriber is refused rather than panicking
        assert!(matches!(
            init_tracing(&settings),
            Err(TracingError::AlreadyInstalled(_))
        ));
    }

    #[test]
    fn test_unwritable_logs_dir_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        File::create(&blocker).unwrap();
        let logs = blocker.join("logs");
        let settings = LogSettings::new(Level::WARN).with_logs_dir(Some(logs.as_path()));

        let error = init_tracing(&settings).unwrap_err();
        assert!(matches!(error, TracingError::LogDirectory { .. }));
        assert!(error.to_string().contains("not-a-dir"));
    }
}
