//! Exactly-once ingestion of voice recordings dropped into watched folders.
/// Application directory helpers.
pub mod app_dirs;
/// Configuration loading and persistence.
pub mod config;
/// Logging setup.
pub mod logging;
/// Discovery, ledger, scanning and the polling loop.
pub mod monitor;
