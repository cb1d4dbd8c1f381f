use std::path::Path;
use std::time::Duration;

use rusqlite::params;

use super::read::cutoff_millis;
use super::util::{map_sql_error, path_key};
use super::{Ledger, LedgerError};
use crate::monitor::signature::{FileSignature, now_millis};

impl Ledger {
    /// Record the outcome of a processing attempt, replacing any earlier row
    /// for the same path.
    ///
    /// `attempts` counts consecutive writes for an unchanged signature and
    /// restarts at 1 when the file changed.
    pub fn upsert(
        &self,
        signature: &FileSignature,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.upsert_at(signature, success, error_message, now_millis())
    }

    pub(crate) fn upsert_at(
        &self,
        signature: &FileSignature,
        success: bool,
        error_message: Option<&str>,
        processed_at_ms: i64,
    ) -> Result<(), LedgerError> {
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        tx.prepare_cached(
            "INSERT INTO processed_files
                (path, size, modified_ms, processed_at_ms, success, error_message, attempts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
             ON CONFLICT(path) DO UPDATE SET
                attempts = CASE
                    WHEN processed_files.size = excluded.size
                     AND processed_files.modified_ms = excluded.modified_ms
                    THEN processed_files.attempts + 1
                    ELSE 1
                END,
                size = excluded.size,
                modified_ms = excluded.modified_ms,
                processed_at_ms = excluded.processed_at_ms,
                success = excluded.success,
                error_message = excluded.error_message",
        )
        .map_err(map_sql_error)?
        .execute(params![
            path_key(&signature.path),
            signature.size as i64,
            signature.modified_ms,
            processed_at_ms,
            success as i64,
            error_message
        ])
        .map_err(map_sql_error)?;
        tx.commit().map_err(map_sql_error)?;
        Ok(())
    }

    /// Delete rows written more than `older_than` ago. Returns rows removed.
    pub fn prune(&self, older_than: Duration) -> Result<usize, LedgerError> {
        self.prune_before(cutoff_millis(older_than))
    }

    pub(crate) fn prune_before(&self, cutoff_ms: i64) -> Result<usize, LedgerError> {
        let removed = self
            .connection
            .execute(
                "DELETE FROM processed_files WHERE processed_at_ms < ?1",
                params![cutoff_ms],
            )
            .map_err(map_sql_error)?;
        Ok(removed)
    }

    /// Remove the row for `path` so the next scan offers the file again.
    /// Returns false when no row existed.
    pub fn forget(&self, path: &Path) -> Result<bool, LedgerError> {
        let removed = self
            .connection
            .execute(
                "DELETE FROM processed_files WHERE path = ?1",
                params![path_key(path)],
            )
            .map_err(map_sql_error)?;
        Ok(removed > 0)
    }
}
