//! `memowatch` command-line entry point.

mod cli;

use std::path::Path;
use std::time::Duration;

use memowatch::config::{self, MonitorConfig};
use memowatch::logging;
use memowatch::monitor::{
    Ledger, LedgerRecord, LedgerStats, Monitor, MonitorStatus, STATUS_RECENT_FILES, StatusConfig,
    format_millis,
};
use tracing::info;

use cli::{CliOptions, Command};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = cli::parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    match options.command.clone() {
        Command::InitConfig => init_config(&options),
        Command::Watch => watch(load_config(&options, true)?),
        Command::Scan => scan(load_config(&options, true)?),
        Command::Status { json } => status(&load_config(&options, false)?, json),
        Command::List { hours } => list(&load_config(&options, false)?, hours),
        Command::Prune { days } => prune(&load_config(&options, true)?, days),
        Command::Forget { path } => forget(&load_config(&options, true)?, &path),
    }
}

fn load_config(options: &CliOptions, with_logging: bool) -> Result<MonitorConfig, String> {
    let mut settings = match &options.config_path {
        Some(path) => config::load_settings_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    options.overrides.apply(&mut settings);
    let config = MonitorConfig::from_settings(settings).map_err(|err| err.to_string())?;
    if with_logging && let Err(err) = logging::init(config.log_level) {
        eprintln!("Logging disabled: {err}");
    }
    Ok(config)
}

fn init_config(options: &CliOptions) -> Result<(), String> {
    let path = match &options.config_path {
        Some(path) => path.clone(),
        None => config::config_path().map_err(|err| err.to_string())?,
    };
    if config::write_default_if_missing(&path).map_err(|err| err.to_string())? {
        println!("Wrote default config to {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

fn watch(config: MonitorConfig) -> Result<(), String> {
    let mut monitor = Monitor::from_config(config).map_err(|err| err.to_string())?;
    let handle = monitor.handle();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, finishing current scan");
        handle.stop();
    })
    .map_err(|err| format!("Failed to install Ctrl+C handler: {err}"))?;
    monitor.run();
    Ok(())
}

fn scan(config: MonitorConfig) -> Result<(), String> {
    let mut monitor = Monitor::from_config(config).map_err(|err| err.to_string())?;
    let result = monitor.run_single_scan();
    println!(
        "Scan result: {} new, {} processed, {} failed in {:.2}s",
        result.files_found,
        result.files_processed,
        result.files_failed,
        result.duration.as_secs_f64()
    );
    match result.error {
        Some(err) if !result.success => Err(format!("Scan failed: {err}")),
        _ => Ok(()),
    }
}

fn status(config: &MonitorConfig, json: bool) -> Result<(), String> {
    let stats = if config.ledger_path.exists() {
        Ledger::open_read_only(&config.ledger_path)
            .and_then(|ledger| ledger.stats(STATUS_RECENT_FILES))
            .map_err(|err| err.to_string())?
    } else {
        LedgerStats::default()
    };
    let status = MonitorStatus {
        running: false,
        config: StatusConfig::from(config),
        stats,
    };
    if json {
        let text = serde_json::to_string_pretty(&status).map_err(|err| err.to_string())?;
        println!("{text}");
        return Ok(());
    }
    let cfg = &status.config;
    println!("Ledger: {}", cfg.ledger_path.display());
    println!("Polling interval: {}s", cfg.polling_interval_seconds);
    println!(
        "Age window: {}s to {} days",
        cfg.min_file_age_seconds, cfg.max_file_age_days
    );
    println!("Max attempts: {}", cfg.max_attempts);
    for pattern in &cfg.watch_paths {
        println!("Watching: {pattern}");
    }
    println!("Total processed: {}", status.stats.total_processed);
    println!("Processed in last 24h: {}", status.stats.processed_last_24h);
    if !status.stats.recent_files.is_empty() {
        println!("Recent files:");
        for record in &status.stats.recent_files {
            print_record(record);
        }
    }
    Ok(())
}

fn list(config: &MonitorConfig, hours: u64) -> Result<(), String> {
    if !config.ledger_path.exists() {
        println!("No ledger at {}", config.ledger_path.display());
        return Ok(());
    }
    let ledger = Ledger::open_read_only(&config.ledger_path).map_err(|err| err.to_string())?;
    let records = ledger
        .recent(Duration::from_secs(hours.saturating_mul(3600)))
        .map_err(|err| err.to_string())?;
    if records.is_empty() {
        println!("Nothing processed in the last {hours}h");
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn prune(config: &MonitorConfig, days: u64) -> Result<(), String> {
    let ledger = Ledger::open(&config.ledger_path).map_err(|err| err.to_string())?;
    let removed = ledger
        .prune(Duration::from_secs(days.saturating_mul(24 * 3600)))
        .map_err(|err| err.to_string())?;
    println!("Removed {removed} ledger rows older than {days} days");
    Ok(())
}

fn forget(config: &MonitorConfig, path: &Path) -> Result<(), String> {
    let path = std::path::absolute(path).map_err(|err| err.to_string())?;
    let ledger = Ledger::open(&config.ledger_path).map_err(|err| err.to_string())?;
    if ledger.forget(&path).map_err(|err| err.to_string())? {
        println!("Forgot {}; it will be processed on the next scan", path.display());
    } else {
        println!("{} is not in the ledger", path.display());
    }
    Ok(())
}

fn print_record(record: &LedgerRecord) {
    let state = if record.success { "ok" } else { "FAILED" };
    let mut line = format!(
        "  {}  {:<6}  {}",
        format_millis(record.processed_at_ms),
        state,
        record.path.display()
    );
    if let Some(error) = &record.error_message {
        line.push_str(&format!("  ({error})"));
    }
    if record.attempts > 1 {
        line.push_str(&format!("  [attempts: {}]", record.attempts));
    }
    println!("{line}");
}
