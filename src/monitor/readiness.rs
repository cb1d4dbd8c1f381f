//! Age window deciding whether a recording is complete and still worth ingesting.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::config::MonitorConfig;

/// Outcome of checking a file's age against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Inside the window; eligible for processing.
    Ready,
    /// Modified too recently; may still be written. Retry on a later scan.
    TooNew,
    /// Older than the maximum age; skipped until the file changes again.
    TooOld,
}

/// Accepts ages in the half-open window `[min_age, max_age)`: a file exactly
/// `min_age` old is ready, a file exactly `max_age` old is too old.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessFilter {
    min_age: Duration,
    max_age: Duration,
}

impl ReadinessFilter {
    pub fn new(min_age: Duration, max_age: Duration) -> Self {
        Self { min_age, max_age }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.min_file_age, config.max_file_age)
    }

    /// Classify a file age.
    pub fn classify(&self, age: Duration) -> Readiness {
        if age < self.min_age {
            Readiness::TooNew
        } else if age >= self.max_age {
            Readiness::TooOld
        } else {
            Readiness::Ready
        }
    }

    /// Stat `path` and classify it relative to `now`.
    ///
    /// Modification times in the future count as age zero.
    pub fn assess_at(&self, path: &Path, now: SystemTime) -> std::io::Result<Readiness> {
        let modified = std::fs::metadata(path)?.modified()?;
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        Ok(self.classify(age))
    }

    /// True when `path` is inside the age window right now.
    ///
    /// Stat failures are logged and reported as not ready.
    pub fn is_ready(&self, path: &Path) -> bool {
        self.is_ready_at(path, SystemTime::now())
    }

    pub fn is_ready_at(&self, path: &Path, now: SystemTime) -> bool {
        match self.assess_at(path, now) {
            Ok(Readiness::Ready) => true,
            Ok(Readiness::TooNew) => {
                debug!(path = %path.display(), "File too new, waiting");
                false
            }
            Ok(Readiness::TooOld) => {
                debug!(path = %path.display(), "File too old, skipping");
                false
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Error checking file readiness");
                false
            }
        }
    }
}
