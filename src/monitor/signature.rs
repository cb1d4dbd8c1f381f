//! Identity of one revision of a file on disk.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// `(path, size, modified time)` observed for a file.
///
/// The modification time is normalized to whole milliseconds since the Unix
/// epoch so two stat calls on an unchanged file always compare equal. A change
/// to either size or modification time is a new revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSignature {
    pub path: PathBuf,
    pub size: u64,
    pub modified_ms: i64,
}

/// Errors raised while reading the signature of a file.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The file could not be stat'ed (vanished, permission denied, ...).
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The modification time predates the Unix epoch.
    #[error("Time conversion failed for {path}")]
    Time { path: PathBuf },
}

impl FileSignature {
    /// Stat `path` now and build its signature.
    pub fn from_path(path: &Path) -> Result<Self, SignatureError> {
        let path = absolute_path(path)?;
        let meta = std::fs::metadata(&path).map_err(|source| SignatureError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_metadata(path, &meta)
    }

    pub(crate) fn from_metadata(path: PathBuf, meta: &Metadata) -> Result<Self, SignatureError> {
        let modified = meta.modified().map_err(|source| SignatureError::Io {
            path: path.clone(),
            source,
        })?;
        let modified_ms = to_millis(modified, &path)?;
        Ok(Self {
            path,
            size: meta.len(),
            modified_ms,
        })
    }

    /// Modification time rendered as RFC 3339 for display.
    pub fn modified_at(&self) -> String {
        format_millis(self.modified_ms)
    }
}

pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf, SignatureError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::path::absolute(path).map_err(|source| SignatureError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn to_millis(time: SystemTime, path: &Path) -> Result<i64, SignatureError> {
    let duration = time
        .duration_since(UNIX_EPOCH)
        .map_err(|_| SignatureError::Time {
            path: path.to_path_buf(),
        })?;
    Ok(duration.as_millis().min(i64::MAX as u128) as i64)
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis().min(i64::MAX as u128) as i64)
        .unwrap_or(0)
}

/// Render epoch milliseconds as an RFC 3339 UTC timestamp.
pub fn format_millis(millis: i64) -> String {
    let nanos = i128::from(millis) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|time| time.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}
