use std::path::PathBuf;

use thiserror::Error;

use crate::monitor::discovery::DiscoveryError;
use crate::monitor::ledger::LedgerError;

/// Errors that abort a whole scan pass. Processor failures never surface here.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Listing candidate files failed.
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    /// The ledger could not be read while filtering candidates.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// The outcome for a processed file could not be written to the ledger.
    #[error("Could not record outcome for {path}: {message}")]
    Unrecorded { path: PathBuf, message: String },
    /// Discovery panicked.
    #[error("Discovery panicked: {0}")]
    Panicked(String),
}
