//! Durable record of every recording the monitor has attempted.
//!
//! One row per path. Each processing attempt replaces the row for its path, so
//! a file that changes after being processed is detected by signature mismatch
//! and reprocessed, overwriting the earlier outcome.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::signature::FileSignature;

mod read;
mod schema;
mod util;
mod write;

/// Outcome of the most recent processing attempt for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub path: PathBuf,
    pub size: u64,
    pub modified_ms: i64,
    /// When the row was written, in epoch milliseconds.
    pub processed_at_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
    /// Consecutive attempts recorded for this exact signature.
    pub attempts: u32,
}

impl LedgerRecord {
    /// Signature the record was written for.
    pub fn signature(&self) -> FileSignature {
        FileSignature {
            path: self.path.clone(),
            size: self.size,
            modified_ms: self.modified_ms,
        }
    }

    pub fn matches(&self, signature: &FileSignature) -> bool {
        self.path == signature.path
            && self.size == signature.size
            && self.modified_ms == signature.modified_ms
    }
}

/// Aggregate counts shown by status surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total_processed: u64,
    pub processed_last_24h: u64,
    pub recent_files: Vec<LedgerRecord>,
}

/// Errors returned by ledger operations.
///
/// A failed write after a successful processing attempt leaves the file
/// unmarked, so it is offered to the processor again on the next scan.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// SQLite query failed.
    #[error("Ledger query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Failed to create the directory holding the ledger file.
    #[error("Could not create ledger directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Database is locked or busy.
    #[error("Ledger database is busy, please retry")]
    Busy,
    /// SQLite returned an unexpected result.
    #[error("SQLite returned an unexpected result")]
    Unexpected,
}

/// SQLite-backed processed-file ledger.
pub struct Ledger {
    connection: Connection,
    path: PathBuf,
}

impl Ledger {
    /// Open (or create) the ledger at `path`, upgrading older schemas in place.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        util::create_parent_if_needed(path)?;
        let connection = Connection::open(path).map_err(util::map_sql_error)?;
        let ledger = Self {
            connection,
            path: path.to_path_buf(),
        };
        ledger.apply_pragmas()?;
        schema::apply_schema(&ledger.connection)?;
        Ok(ledger)
    }

    /// Open an existing ledger for reading only, e.g. from a status reporter
    /// running next to the monitor.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(util::map_sql_error)?;
        connection
            .execute_batch("PRAGMA busy_timeout=5000;")
            .map_err(util::map_sql_error)?;
        Ok(Self {
            connection,
            path: path.to_path_buf(),
        })
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply_pragmas(&self) -> Result<(), LedgerError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
            )
            .map_err(util::map_sql_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
