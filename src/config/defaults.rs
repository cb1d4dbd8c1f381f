use std::collections::HashSet;

use super::LogLevel;

pub(super) const MIN_POLLING_INTERVAL_SECONDS: u64 = 1;

pub(super) fn default_polling_interval_seconds() -> u64 {
    60
}

pub(super) fn default_min_file_age_seconds() -> u64 {
    30
}

pub(super) fn default_max_file_age_days() -> u64 {
    7
}

pub(super) fn default_max_attempts() -> u32 {
    1
}

pub(super) fn default_log_level() -> LogLevel {
    LogLevel::Info
}

pub(super) fn default_extensions() -> Vec<String> {
    ["m4a", "wav", "mp3", "aiff", "aac"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Voice memo folders synced through iCloud Drive.
pub(super) fn default_watch_paths() -> Vec<String> {
    [
        "~/Library/Mobile Documents/com~apple~CloudDocs/Personal*/Voice memos",
        "~/Library/Mobile Documents/com~apple~CloudDocs/Content Captures",
        "~/Library/Mobile Documents/com~apple~CloudDocs/ZWC/*/Recordings",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub(super) fn clamp_polling_interval(seconds: u64) -> u64 {
    seconds.max(MIN_POLLING_INTERVAL_SECONDS)
}

pub(super) fn clamp_max_attempts(attempts: u32) -> u32 {
    attempts.max(1)
}

/// Lowercase extensions and strip a leading dot so `.M4A` matches `m4a`.
/// Later repeats are dropped; first-seen order is kept.
pub(super) fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    extensions
        .into_iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && seen.insert(ext.clone()))
        .collect()
}
