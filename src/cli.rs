//! Argument parsing for the `memowatch` binary.

use std::path::PathBuf;

use memowatch::config::{LogLevel, MonitorSettings};

const DEFAULT_PRUNE_DAYS: u64 = 30;
const DEFAULT_LIST_HOURS: u64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Watch,
    Scan,
    Status { json: bool },
    List { hours: u64 },
    Prune { days: u64 },
    Forget { path: PathBuf },
    InitConfig,
}

/// Values given on the command line that take precedence over `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub(crate) interval: Option<u64>,
    pub(crate) min_age: Option<u64>,
    pub(crate) max_age_days: Option<u64>,
    pub(crate) db_path: Option<PathBuf>,
    pub(crate) log_level: Option<LogLevel>,
    pub(crate) watch_paths: Vec<String>,
    pub(crate) dry_run: bool,
}

impl Overrides {
    pub(crate) fn apply(&self, settings: &mut MonitorSettings) {
        if let Some(interval) = self.interval {
            settings.polling_interval_seconds = interval;
        }
        if let Some(min_age) = self.min_age {
            settings.min_file_age_seconds = min_age;
        }
        if let Some(days) = self.max_age_days {
            settings.max_file_age_days = days;
        }
        if let Some(path) = &self.db_path {
            settings.ledger_path = Some(path.clone());
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
        if !self.watch_paths.is_empty() {
            settings.watch_paths = self.watch_paths.clone();
        }
        if self.dry_run {
            settings.processor.command.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub(crate) command: Command,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) overrides: Overrides,
}

pub(crate) fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut command: Option<Command> = None;
    let mut config_path = None;
    let mut overrides = Overrides::default();
    let mut json = false;
    let mut days: Option<u64> = None;
    let mut hours: Option<u64> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" => {
                config_path = Some(PathBuf::from(take_value(&args, &mut idx, "--config")?));
            }
            "--interval" => overrides.interval = Some(take_number(&args, &mut idx, "--interval")?),
            "--min-age" => overrides.min_age = Some(take_number(&args, &mut idx, "--min-age")?),
            "--max-age-days" => {
                overrides.max_age_days = Some(take_number(&args, &mut idx, "--max-age-days")?);
            }
            "--db-path" => {
                overrides.db_path = Some(PathBuf::from(take_value(&args, &mut idx, "--db-path")?));
            }
            "--log-level" => {
                let value = take_value(&args, &mut idx, "--log-level")?;
                overrides.log_level = Some(value.parse::<LogLevel>().map_err(|err| err.to_string())?);
            }
            "--watch" => overrides
                .watch_paths
                .push(take_value(&args, &mut idx, "--watch")?.to_string()),
            "--dry-run" => overrides.dry_run = true,
            "--scan-only" => set_command(&mut command, Command::Scan)?,
            "--json" => json = true,
            "--days" => days = Some(take_number(&args, &mut idx, "--days")?),
            "--hours" => hours = Some(take_number(&args, &mut idx, "--hours")?),
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            word if command.is_none() => {
                let parsed = match word {
                    "watch" => Command::Watch,
                    "scan" => Command::Scan,
                    "status" => Command::Status { json: false },
                    "list" => Command::List { hours: 0 },
                    "prune" => Command::Prune { days: 0 },
                    "forget" => Command::Forget {
                        path: PathBuf::new(),
                    },
                    "init-config" => Command::InitConfig,
                    other => return Err(format!("Unknown command: {other}\n\n{}", help_text())),
                };
                command = Some(parsed);
            }
            word => positional.push(word.to_string()),
        }
        idx += 1;
    }

    let command = match command.unwrap_or(Command::Watch) {
        Command::Status { .. } => Command::Status { json },
        Command::List { .. } => Command::List {
            hours: hours.unwrap_or(DEFAULT_LIST_HOURS),
        },
        Command::Prune { .. } => Command::Prune {
            days: days.unwrap_or(DEFAULT_PRUNE_DAYS),
        },
        Command::Forget { .. } => {
            let path = positional
                .pop()
                .ok_or_else(|| "forget requires a file path".to_string())?;
            Command::Forget {
                path: PathBuf::from(path),
            }
        }
        other => other,
    };
    if let Some(extra) = positional.first() {
        return Err(format!("Unexpected argument: {extra}\n\n{}", help_text()));
    }
    Ok(Some(CliOptions {
        command,
        config_path,
        overrides,
    }))
}

fn set_command(command: &mut Option<Command>, value: Command) -> Result<(), String> {
    match command {
        Some(existing) if *existing != value => {
            Err("--scan-only cannot be combined with another command".to_string())
        }
        _ => {
            *command = Some(value);
            Ok(())
        }
    }
}

fn take_value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn take_number(args: &[String], idx: &mut usize, flag: &str) -> Result<u64, String> {
    let value = take_value(args, idx, flag)?;
    value
        .parse::<u64>()
        .map_err(|_| format!("{flag} expects a non-negative integer, got `{value}`"))
}

pub(crate) fn help_text() -> String {
    [
        "memowatch",
        "",
        "Polls voice memo folders and hands each new, fully written recording to a processor once.",
        "",
        "Usage:",
        "  memowatch [command] [options]",
        "",
        "Commands:",
        "  watch                 Scan continuously until interrupted (default)",
        "  scan                  Run a single scan and exit",
        "  status [--json]       Show configuration and ledger statistics",
        "  list [--hours N]      List files processed in the last N hours (default 24)",
        "  prune [--days N]      Delete ledger rows older than N days (default 30)",
        "  forget <path>         Remove a file from the ledger so it is processed again",
        "  init-config           Write a default config file if none exists",
        "",
        "Options:",
        "  --config <path>       Config file (default: <config dir>/.memowatch/config.toml)",
        "  --interval <secs>     Polling interval in seconds",
        "  --min-age <secs>      Minimum file age before processing",
        "  --max-age-days <n>    Maximum file age in days",
        "  --db-path <path>      Ledger database path",
        "  --log-level <level>   error, warn, info, debug or trace",
        "  --watch <pattern>     Directory pattern to watch (repeatable, replaces config)",
        "  --dry-run             Log files instead of running the processor command",
        "  --scan-only           Same as the scan command",
        "  -h, --help            Show this help",
    ]
    .join("\n")
}
