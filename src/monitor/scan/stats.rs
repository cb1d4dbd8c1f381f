use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::ScanError;

/// Summary of one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    /// New, ready files handed to the processor.
    pub files_found: usize,
    /// Files processed successfully and recorded in the ledger.
    pub files_processed: usize,
    pub files_failed: usize,
    pub duration: Duration,
    /// Whether the pass itself completed. Processor failures do not clear
    /// this; a discovery fault or a ledger read or write error does.
    pub success: bool,
    pub error: Option<String>,
}

impl ScanResult {
    pub(super) fn empty(duration: Duration) -> Self {
        Self {
            duration,
            success: true,
            ..Self::default()
        }
    }

    pub(super) fn aborted(error: &ScanError, duration: Duration) -> Self {
        Self {
            duration,
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// What happened to a single file during a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub success: bool,
    pub error: Option<String>,
    pub details: Option<serde_json::Value>,
    /// False when no ledger row was written for this attempt.
    pub recorded: bool,
    /// Set when the ledger write after processing failed.
    pub ledger_error: Option<String>,
}

impl FileOutcome {
    pub(super) fn unrecorded(path: PathBuf, error: String) -> Self {
        Self {
            path,
            success: false,
            error: Some(error),
            details: None,
            recorded: false,
            ledger_error: None,
        }
    }
}
