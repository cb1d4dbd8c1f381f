//! Monitor configuration: TOML settings on disk and the resolved runtime snapshot.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_dirs;

mod defaults;
mod errors;
mod load;
mod save;


pub use errors::ConfigError;
pub use load::{config_path, load_or_default, load_settings_from};
pub use save::{save_settings_to_path, write_default_if_missing};

use defaults::{
    clamp_max_attempts, clamp_polling_interval, default_extensions, default_log_level,
    default_max_attempts, default_max_file_age_days, default_min_file_age_seconds,
    default_polling_interval_seconds, default_watch_paths, normalize_extensions,
};

/// Default filename used to store the monitor configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Log verbosity accepted in config files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        default_log_level()
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigError::InvalidValue {
                key: "log_level",
                reason: format!("unknown level `{other}`"),
            }),
        }
    }
}

/// External command used to process each discovered recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSettings {
    /// Program followed by its arguments; the recording path is appended last.
    /// Empty means dry-run: files are logged and marked processed.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Settings as stored in `config.toml`.
///
/// Config keys (TOML): `polling_interval_seconds`, `min_file_age_seconds`,
/// `max_file_age_days`, `ledger_path`, `log_level`, `watch_paths`,
/// `extensions`, `max_attempts`, `retention_days`, `[processor]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_polling_interval_seconds")]
    pub polling_interval_seconds: u64,
    #[serde(default = "default_min_file_age_seconds")]
    pub min_file_age_seconds: u64,
    #[serde(default = "default_max_file_age_days")]
    pub max_file_age_days: u64,
    /// Ledger database location; defaults to the app directory.
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    #[serde(default)]
    pub log_level: LogLevel,
    /// Directory patterns to poll. `~` and glob wildcards are expanded.
    #[serde(default = "default_watch_paths")]
    pub watch_paths: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Attempts per file revision before a failure is final.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Prune ledger rows older than this many days when the monitor starts.
    #[serde(default)]
    pub retention_days: Option<u64>,
    #[serde(default)]
    pub processor: ProcessorSettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            polling_interval_seconds: default_polling_interval_seconds(),
            min_file_age_seconds: default_min_file_age_seconds(),
            max_file_age_days: default_max_file_age_days(),
            ledger_path: None,
            log_level: LogLevel::default(),
            watch_paths: default_watch_paths(),
            extensions: default_extensions(),
            max_attempts: default_max_attempts(),
            retention_days: None,
            processor: ProcessorSettings::default(),
        }
    }
}

impl MonitorSettings {
    pub(crate) fn normalized(self) -> Self {
        Self {
            polling_interval_seconds: clamp_polling_interval(self.polling_interval_seconds),
            max_attempts: clamp_max_attempts(self.max_attempts),
            extensions: normalize_extensions(self.extensions),
            ..self
        }
    }
}

/// Immutable configuration snapshot held for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub polling_interval: Duration,
    pub min_file_age: Duration,
    pub max_file_age: Duration,
    pub ledger_path: PathBuf,
    pub log_level: LogLevel,
    pub watch_paths: Vec<String>,
    pub extensions: Vec<String>,
    pub max_attempts: u32,
    pub retention: Option<Duration>,
    pub processor_command: Vec<String>,
}

impl MonitorConfig {
    /// Default settings with an explicit ledger location.
    pub fn with_ledger(ledger_path: impl Into<PathBuf>) -> Self {
        let settings = MonitorSettings {
            ledger_path: Some(ledger_path.into()),
            ..MonitorSettings::default()
        };
        Self::resolve_with_ledger(settings.normalized(), None)
    }

    /// Resolve settings into a runtime snapshot, validating the age window.
    pub fn from_settings(settings: MonitorSettings) -> Result<Self, ConfigError> {
        let settings = settings.normalized();
        let default_ledger = if settings.ledger_path.is_none() {
            Some(app_dirs::default_ledger_path().map_err(load::map_app_dir_error)?)
        } else {
            None
        };
        let config = Self::resolve_with_ledger(settings, default_ledger);
        config.validate()?;
        Ok(config)
    }

    fn resolve_with_ledger(settings: MonitorSettings, default_ledger: Option<PathBuf>) -> Self {
        let ledger_path = settings
            .ledger_path
            .or(default_ledger)
            .unwrap_or_else(|| PathBuf::from(app_dirs::LEDGER_FILE_NAME));
        Self {
            polling_interval: Duration::from_secs(settings.polling_interval_seconds),
            min_file_age: Duration::from_secs(settings.min_file_age_seconds),
            max_file_age: Duration::from_secs(
                settings.max_file_age_days.saturating_mul(SECONDS_PER_DAY),
            ),
            ledger_path,
            log_level: settings.log_level,
            watch_paths: settings.watch_paths,
            extensions: settings.extensions,
            max_attempts: settings.max_attempts,
            retention: settings
                .retention_days
                .map(|days| Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))),
            processor_command: settings.processor.command,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_age <= self.min_file_age {
            return Err(ConfigError::InvalidValue {
                key: "max_file_age_days",
                reason: format!(
                    "maximum age ({}s) must exceed minimum age ({}s)",
                    self.max_file_age.as_secs(),
                    self.min_file_age.as_secs()
                ),
            });
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "extensions",
                reason: "at least one extension is required".to_string(),
            });
        }
        Ok(())
    }

    /// Maximum file age expressed in whole days, as configured.
    pub fn max_file_age_days(&self) -> u64 {
        self.max_file_age.as_secs() / SECONDS_PER_DAY
    }
}
