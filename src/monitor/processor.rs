//! The injected processing step applied to each new recording.

use std::path::Path;
use std::process::Command;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::MonitorConfig;

/// Result reported by a processor for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOutcome {
    pub success: bool,
    pub error: Option<String>,
    /// Free-form data returned by the processor, e.g. the URL of a published note.
    pub details: Option<serde_json::Value>,
}

impl ProcessOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
            details: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// `page_url` from the details, when the processor published a page.
    pub fn page_url(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|details| details.get("page_url"))
            .and_then(|url| url.as_str())
    }
}

/// Faults raised by a processor, as opposed to a reported failure.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No program was configured.
    #[error("Processor command is empty")]
    EmptyCommand,
    /// The program could not be started.
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// Any other fault inside a processor.
    #[error("{0}")]
    Other(String),
}

/// Processes one recording.
///
/// The ledger write that follows a call can fail after the processor has
/// already succeeded; the file is then offered again on the next scan.
/// Implementations must therefore tolerate being called more than once for
/// the same file revision.
pub trait Processor {
    fn process(&mut self, path: &Path) -> Result<ProcessOutcome, ProcessError>;
}

impl<F> Processor for F
where
    F: FnMut(&Path) -> ProcessOutcome,
{
    fn process(&mut self, path: &Path) -> Result<ProcessOutcome, ProcessError> {
        Ok(self(path))
    }
}

/// Logs each file and reports success without doing any work.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunProcessor;

impl Processor for DryRunProcessor {
    fn process(&mut self, path: &Path) -> Result<ProcessOutcome, ProcessError> {
        info!(path = %path.display(), "Dry run: would process file");
        Ok(ProcessOutcome::succeeded())
    }
}

/// Runs an external program with the recording path appended as the last
/// argument. Exit status 0 is success; stdout parsed as JSON becomes the
/// outcome details, stderr becomes the failure message.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: String,
    args: Vec<String>,
}

impl CommandProcessor {
    pub fn new(command: Vec<String>) -> Result<Self, ProcessError> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|program| !program.trim().is_empty())
            .ok_or(ProcessError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Processor for CommandProcessor {
    fn process(&mut self, path: &Path) -> Result<ProcessOutcome, ProcessError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|source| ProcessError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if output.status.success() {
            let outcome = match serde_json::from_slice::<serde_json::Value>(&output.stdout) {
                Ok(details) => ProcessOutcome::succeeded().with_details(details),
                Err(_) => ProcessOutcome::succeeded(),
            };
            return Ok(outcome);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            format!("`{}` exited with {}", self.program, output.status)
        } else {
            stderr.to_string()
        };
        Ok(ProcessOutcome::failed(message))
    }
}

/// Processor selected by configuration: the configured command, or a dry run
/// when none is set.
pub fn processor_from_config(config: &MonitorConfig) -> Result<Box<dyn Processor>, ProcessError> {
    if config.processor_command.is_empty() {
        return Ok(Box::new(DryRunProcessor));
    }
    Ok(Box::new(CommandProcessor::new(
        config.processor_command.clone(),
    )?))
}
