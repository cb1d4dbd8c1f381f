use std::path::Path;

use super::LedgerError;

/// Translate rusqlite errors into friendlier LedgerError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> LedgerError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.code == rusqlite::ErrorCode::DatabaseBusy
                || sql_err.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            LedgerError::Busy
        }
        rusqlite::Error::InvalidQuery
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::MultipleStatement => LedgerError::Unexpected,
        other => LedgerError::Sql(other),
    }
}

/// Stable text form of a path for the `path` key column.
pub(super) fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), LedgerError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| LedgerError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
