//! Continuous polling loop around the scanner.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use super::discovery::{Discovery, GlobDiscovery};
use super::ledger::{Ledger, LedgerError, LedgerStats};
use super::processor::{ProcessError, Processor, processor_from_config};
use super::scan::{ScanResult, Scanner};
use super::stop_signal::StopSignal;
use crate::config::MonitorConfig;

/// Number of recent ledger rows included in a status snapshot.
pub const STATUS_RECENT_FILES: usize = 5;

/// Errors raised while assembling a monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Processor(#[from] ProcessError),
}

/// Configuration fields reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusConfig {
    pub polling_interval_seconds: u64,
    pub min_file_age_seconds: u64,
    pub max_file_age_days: u64,
    pub ledger_path: PathBuf,
    pub watch_paths: Vec<String>,
    pub max_attempts: u32,
}

impl From<&MonitorConfig> for StatusConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            polling_interval_seconds: config.polling_interval.as_secs(),
            min_file_age_seconds: config.min_file_age.as_secs(),
            max_file_age_days: config.max_file_age_days(),
            ledger_path: config.ledger_path.clone(),
            watch_paths: config.watch_paths.clone(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub config: StatusConfig,
    pub stats: LedgerStats,
}

/// Polls discovery on a fixed interval and feeds new files to the processor.
///
/// Owns the ledger connection and the run state. Scans never overlap and are
/// never preempted; `stop` takes effect once the current scan finishes.
pub struct Monitor {
    config: MonitorConfig,
    ledger: Ledger,
    discovery: Box<dyn Discovery>,
    processor: Box<dyn Processor>,
    signal: Arc<StopSignal>,
}

impl Monitor {
    /// Open the configured ledger and wire in the given discovery and processor.
    pub fn new(
        config: MonitorConfig,
        discovery: Box<dyn Discovery>,
        processor: Box<dyn Processor>,
    ) -> Result<Self, LedgerError> {
        let ledger = Ledger::open(&config.ledger_path)?;
        Ok(Self {
            config,
            ledger,
            discovery,
            processor,
            signal: Arc::new(StopSignal::new()),
        })
    }

    /// Glob discovery over the configured watch paths and the configured processor.
    pub fn from_config(config: MonitorConfig) -> Result<Self, MonitorError> {
        let discovery = Box::new(GlobDiscovery::from_config(&config));
        let processor = processor_from_config(&config)?;
        Ok(Self::new(config, discovery, processor)?)
    }

    /// Cloneable handle for stopping the loop or reading status from elsewhere.
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            signal: Arc::clone(&self.signal),
            config: self.config.clone(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// One pass, independent of the run state.
    pub fn run_single_scan(&mut self) -> ScanResult {
        let scanner = Scanner::from_config(&self.ledger, &self.config);
        scanner.run_single_scan(self.discovery.as_ref(), self.processor.as_mut())
    }

    /// Scan, sleep, repeat until stopped. Blocks the calling thread.
    pub fn run(&mut self) {
        self.signal.start();
        self.log_startup();
        self.apply_retention();

        while self.signal.is_running() {
            let result = self.run_single_scan();
            if !result.success {
                warn!(
                    error = result.error.as_deref().unwrap_or("unknown error"),
                    "Scan failed; retrying after the polling interval"
                );
            }
            if !self.signal.is_running() {
                break;
            }
            if !self.signal.wait(self.config.polling_interval) {
                break;
            }
        }
        self.signal.stop();
        info!("Monitor stopped");
    }

    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn is_running(&self) -> bool {
        self.signal.is_running()
    }

    pub fn status(&self) -> Result<MonitorStatus, LedgerError> {
        Ok(MonitorStatus {
            running: self.is_running(),
            config: StatusConfig::from(&self.config),
            stats: self.ledger.stats(STATUS_RECENT_FILES)?,
        })
    }

    fn log_startup(&self) {
        let config = &self.config;
        info!(
            polling_interval_seconds = config.polling_interval.as_secs(),
            min_file_age_seconds = config.min_file_age.as_secs(),
            max_file_age_days = config.max_file_age_days(),
            max_attempts = config.max_attempts,
            ledger = %config.ledger_path.display(),
            "Starting monitor"
        );
        for pattern in &config.watch_paths {
            info!(pattern = %pattern, "Watching");
        }
        match self.ledger.stats(STATUS_RECENT_FILES) {
            Ok(stats) => info!(
                total_processed = stats.total_processed,
                processed_last_24h = stats.processed_last_24h,
                "Ledger summary"
            ),
            Err(err) => warn!(error = %err, "Could not read ledger summary"),
        }
    }

    fn apply_retention(&self) -> Option<usize> {
        let retention = self.config.retention?;
        match self.ledger.prune(retention) {
            Ok(removed) => {
                info!(removed, retention_days = retention.as_secs() / 86_400, "Pruned ledger");
                Some(removed)
            }
            Err(err) => {
                error!(error = %err, "Failed to prune ledger");
                None
            }
        }
    }
}

/// Stop and status access to a running [`Monitor`] from another thread.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    signal: Arc<StopSignal>,
    config: MonitorConfig,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.signal.stop();
    }

    pub fn is_running(&self) -> bool {
        self.signal.is_running()
    }

    /// Reads statistics through a separate read-only connection.
    pub fn status(&self) -> Result<MonitorStatus, LedgerError> {
        let ledger = Ledger::open_read_only(&self.config.ledger_path)?;
        Ok(MonitorStatus {
            running: self.is_running(),
            config: StatusConfig::from(&self.config),
            stats: ledger.stats(STATUS_RECENT_FILES)?,
        })
    }
}
