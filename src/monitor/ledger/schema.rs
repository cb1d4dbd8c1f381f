use std::collections::HashSet;

use rusqlite::Connection;

use super::LedgerError;
use super::util::map_sql_error;

pub(super) fn apply_schema(connection: &Connection) -> Result<(), LedgerError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS processed_files (
                path TEXT PRIMARY KEY,
                size INTEGER NOT NULL,
                modified_ms INTEGER NOT NULL,
                processed_at_ms INTEGER NOT NULL,
                success INTEGER NOT NULL,
                error_message TEXT,
                attempts INTEGER NOT NULL DEFAULT 1
             );",
        )
        .map_err(map_sql_error)?;
    ensure_optional_columns(connection)?;
    connection
        .execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_processed_files_processed_at
                ON processed_files (processed_at_ms);",
        )
        .map_err(map_sql_error)?;
    Ok(())
}

/// Ledgers written before retry tracking lack the `attempts` column.
fn ensure_optional_columns(connection: &Connection) -> Result<(), LedgerError> {
    let mut stmt = connection
        .prepare("PRAGMA table_info(processed_files)")
        .map_err(map_sql_error)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(map_sql_error)?
        .collect::<Result<HashSet<String>, _>>()
        .map_err(map_sql_error)?;
    if !columns.contains("attempts") {
        connection
            .execute(
                "ALTER TABLE processed_files ADD COLUMN attempts INTEGER NOT NULL DEFAULT 1",
                [],
            )
            .map_err(map_sql_error)?;
    }
    Ok(())
}
