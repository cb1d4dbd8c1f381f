use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{OptionalExtension, Row, params};

use super::util::{map_sql_error, path_key};
use super::{Ledger, LedgerError, LedgerRecord, LedgerStats};
use crate::monitor::signature::{FileSignature, now_millis};

const RECORD_COLUMNS: &str =
    "path, size, modified_ms, processed_at_ms, success, error_message, attempts";
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

impl Ledger {
    /// True iff a row with this exact path, size and modification time exists.
    pub fn exists(&self, signature: &FileSignature) -> Result<bool, LedgerError> {
        let count: i64 = self
            .connection
            .prepare_cached(
                "SELECT COUNT(*) FROM processed_files
                 WHERE path = ?1 AND size = ?2 AND modified_ms = ?3",
            )
            .map_err(map_sql_error)?
            .query_row(
                params![
                    path_key(&signature.path),
                    signature.size as i64,
                    signature.modified_ms
                ],
                |row| row.get(0),
            )
            .map_err(map_sql_error)?;
        Ok(count > 0)
    }

    /// Fetch the row for `path`, whatever signature it was written for.
    pub fn lookup(&self, path: &Path) -> Result<Option<LedgerRecord>, LedgerError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM processed_files WHERE path = ?1");
        self.connection
            .prepare_cached(&sql)
            .map_err(map_sql_error)?
            .query_row(params![path_key(path)], record_from_row)
            .optional()
            .map_err(map_sql_error)
    }

    /// Total number of rows.
    pub fn count(&self) -> Result<u64, LedgerError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM processed_files", [], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok(count.max(0) as u64)
    }

    /// Rows written within the last `since`, newest first.
    pub fn recent(&self, since: Duration) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.recent_limited(since, None)
    }

    /// Number of rows written within the last `since`.
    pub fn count_since(&self, since: Duration) -> Result<u64, LedgerError> {
        let count: i64 = self
            .connection
            .prepare_cached("SELECT COUNT(*) FROM processed_files WHERE processed_at_ms > ?1")
            .map_err(map_sql_error)?
            .query_row(params![cutoff_millis(since)], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok(count.max(0) as u64)
    }

    /// Totals plus up to `recent_limit` rows from the last 24 hours.
    pub fn stats(&self, recent_limit: usize) -> Result<LedgerStats, LedgerError> {
        Ok(LedgerStats {
            total_processed: self.count()?,
            processed_last_24h: self.count_since(DAY)?,
            recent_files: self.recent_limited(DAY, Some(recent_limit))?,
        })
    }

    fn recent_limited(
        &self,
        since: Duration,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM processed_files
             WHERE processed_at_ms > ?1
             ORDER BY processed_at_ms DESC, path ASC
             LIMIT ?2"
        );
        let limit = limit.map(|limit| limit.min(i64::MAX as usize) as i64).unwrap_or(-1);
        let mut stmt = self.connection.prepare_cached(&sql).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![cutoff_millis(since), limit], record_from_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }
}

pub(super) fn cutoff_millis(age: Duration) -> i64 {
    let age_ms = age.as_millis().min(i64::MAX as u128) as i64;
    now_millis().saturating_sub(age_ms)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerRecord> {
    let path: String = row.get(0)?;
    Ok(LedgerRecord {
        path: PathBuf::from(path),
        size: row.get::<_, i64>(1)?.max(0) as u64,
        modified_ms: row.get(2)?,
        processed_at_ms: row.get(3)?,
        success: row.get::<_, i64>(4)? != 0,
        error_message: row.get(5)?,
        attempts: row.get::<_, i64>(6)?.clamp(0, u32::MAX as i64) as u32,
    })
}
