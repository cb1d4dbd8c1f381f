//! Enumerates candidate recordings under the configured watch paths.

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::signature::{FileSignature, absolute_path, to_millis};
use crate::app_dirs;
use crate::config::MonitorConfig;

/// A file offered by discovery, with the metadata observed at listing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
    pub modified_ms: i64,
    /// Creation time when the platform reports one.
    pub created_ms: Option<i64>,
}

impl Candidate {
    /// Stat `path` and describe it as a candidate.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let path = absolute_path(path).map_err(std::io::Error::other)?;
        let meta = std::fs::metadata(&path)?;
        Self::from_metadata(path, &meta)
    }

    fn from_metadata(path: PathBuf, meta: &Metadata) -> std::io::Result<Self> {
        let signature =
            FileSignature::from_metadata(path, meta).map_err(std::io::Error::other)?;
        let created_ms = meta
            .created()
            .ok()
            .and_then(|created| to_millis(created, &signature.path).ok());
        Ok(Self {
            path: signature.path,
            size: signature.size,
            modified_ms: signature.modified_ms,
            created_ms,
        })
    }
}

/// Errors that abort a whole discovery pass.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A watch path is not a valid glob pattern.
    #[error("Invalid watch path pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    /// A watch path starts with `~` but no home directory is known.
    #[error("Cannot expand `~` in `{pattern}`: no home directory")]
    NoHomeDir { pattern: String },
}

/// Source of candidate files for a scan.
///
/// Files that cannot be read individually are logged and left out; only
/// failures that make the whole listing meaningless are returned as errors.
pub trait Discovery {
    fn discover(&self) -> Result<Vec<Candidate>, DiscoveryError>;
}

impl<F> Discovery for F
where
    F: Fn() -> Result<Vec<Candidate>, DiscoveryError>,
{
    fn discover(&self) -> Result<Vec<Candidate>, DiscoveryError> {
        self()
    }
}

/// Lists files directly inside every directory matched by the watch patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobDiscovery {
    patterns: Vec<String>,
    extensions: Vec<String>,
}

impl GlobDiscovery {
    /// `extensions` are matched case-insensitively, with or without a leading dot.
    pub fn new(patterns: Vec<String>, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            patterns,
            extensions,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.watch_paths.clone(), config.extensions.clone())
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|wanted| *wanted == ext)
            })
            .unwrap_or(false)
    }

    fn matched_dirs(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        let expanded = expand_home(pattern)?;
        let trimmed = expanded.trim_end_matches(['/', '\\']);
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        let paths = glob::glob(trimmed).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let mut dirs = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_dir() => dirs.push(path),
                Ok(_) => {}
                Err(err) => {
                    warn!(pattern, error = %err, "Skipping unreadable watch path match");
                }
            }
        }
        if dirs.is_empty() {
            debug!(pattern, "Watch path matched no directories");
        }
        Ok(dirs)
    }

    fn list_dir(&self, dir: &Path, seen: &mut HashSet<PathBuf>, out: &mut Vec<Candidate>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "Failed to list watch directory");
                return;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !self.has_wanted_extension(&path) {
                continue;
            }
            let candidate = std::fs::metadata(&path).and_then(|meta| {
                if meta.is_file() {
                    absolute_path(&path)
                        .map_err(std::io::Error::other)
                        .and_then(|abs| Candidate::from_metadata(abs, &meta))
                        .map(Some)
                } else {
                    Ok(None)
                }
            });
            match candidate {
                Ok(Some(candidate)) => {
                    if seen.insert(candidate.path.clone()) {
                        out.push(candidate);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable file");
                }
            }
        }
    }
}

impl Discovery for GlobDiscovery {
    fn discover(&self) -> Result<Vec<Candidate>, DiscoveryError> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for pattern in &self.patterns {
            for dir in self.matched_dirs(pattern)? {
                self.list_dir(&dir, &mut seen, &mut candidates);
            }
        }
        sort_newest_first(&mut candidates);
        debug!(count = candidates.len(), "Discovery finished");
        Ok(candidates)
    }
}

fn sort_newest_first(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.modified_ms
            .cmp(&a.modified_ms)
            .then_with(|| a.path.cmp(&b.path))
    });
}

fn expand_home(pattern: &str) -> Result<String, DiscoveryError> {
    let Some(rest) = pattern.strip_prefix('~') else {
        return Ok(pattern.to_string());
    };
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return Ok(pattern.to_string());
    }
    let home = app_dirs::home_dir().ok_or_else(|| DiscoveryError::NoHomeDir {
        pattern: pattern.to_string(),
    })?;
    let home = glob::Pattern::escape(&home.to_string_lossy());
    Ok(format!("{home}{rest}"))
}
