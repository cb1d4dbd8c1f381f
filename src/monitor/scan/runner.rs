use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::{FileOutcome, ScanError, ScanResult};
use crate::config::MonitorConfig;
use crate::monitor::discovery::{Candidate, Discovery};
use crate::monitor::ledger::{Ledger, LedgerError};
use crate::monitor::processor::{ProcessOutcome, Processor};
use crate::monitor::readiness::ReadinessFilter;
use crate::monitor::signature::FileSignature;

/// One discovery-to-ledger pass over the candidate files.
///
/// Borrows the ledger for the duration of a scan and keeps no state between
/// scans; everything it knows about earlier passes comes from the ledger.
pub struct Scanner<'a> {
    ledger: &'a Ledger,
    readiness: ReadinessFilter,
    max_attempts: u32,
}

impl<'a> Scanner<'a> {
    /// `max_attempts` of 1 means any recorded attempt, failed or not, is final.
    pub fn new(ledger: &'a Ledger, readiness: ReadinessFilter, max_attempts: u32) -> Self {
        Self {
            ledger,
            readiness,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(ledger: &'a Ledger, config: &MonitorConfig) -> Self {
        Self::new(
            ledger,
            ReadinessFilter::from_config(config),
            config.max_attempts,
        )
    }

    /// Keep the candidates that are ready and not yet handled, in input order.
    pub fn discover_new(&self, candidates: Vec<Candidate>) -> Result<Vec<Candidate>, LedgerError> {
        let mut fresh = Vec::new();
        for candidate in candidates {
            if !self.readiness.is_ready(&candidate.path) {
                continue;
            }
            let signature = match FileSignature::from_path(&candidate.path) {
                Ok(signature) => signature,
                Err(err) => {
                    warn!(path = %candidate.path.display(), error = %err, "Skipping file without signature");
                    continue;
                }
            };
            if self.already_handled(&signature)? {
                debug!(path = %candidate.path.display(), "Already processed");
                continue;
            }
            fresh.push(candidate);
        }
        Ok(fresh)
    }

    fn already_handled(&self, signature: &FileSignature) -> Result<bool, LedgerError> {
        if self.max_attempts <= 1 {
            return self.ledger.exists(signature);
        }
        Ok(match self.ledger.lookup(&signature.path)? {
            Some(record) if record.matches(signature) => {
                record.success || record.attempts >= self.max_attempts
            }
            _ => false,
        })
    }

    /// Run the processor on one file and record the outcome.
    ///
    /// Failures, processor faults and panics are all recorded as failed
    /// attempts. A file whose signature cannot be read is reported as failed
    /// without touching the ledger.
    pub fn process_one(&self, candidate: &Candidate, processor: &mut dyn Processor) -> FileOutcome {
        let signature = match FileSignature::from_path(&candidate.path) {
            Ok(signature) => signature,
            Err(err) => {
                warn!(path = %candidate.path.display(), error = %err, "File vanished before processing");
                return FileOutcome::unrecorded(candidate.path.clone(), err.to_string());
            }
        };

        info!(path = %signature.path.display(), size = signature.size, "Processing file");
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| processor.process(&signature.path))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => ProcessOutcome::failed(format!("Processor error: {err}")),
            Err(payload) => ProcessOutcome::failed(format!(
                "Processor panicked: {}",
                panic_message(payload.as_ref())
            )),
        };

        if outcome.success {
            match outcome.page_url() {
                Some(url) => info!(path = %signature.path.display(), page_url = url, "Processed file"),
                None => info!(path = %signature.path.display(), "Processed file"),
            }
        } else {
            warn!(
                path = %signature.path.display(),
                error = outcome.error.as_deref().unwrap_or("unknown error"),
                "Failed to process file"
            );
        }

        let ledger_error = match self
            .ledger
            .upsert(&signature, outcome.success, outcome.error.as_deref())
        {
            Ok(()) => None,
            Err(err) => {
                error!(path = %signature.path.display(), error = %err, "Failed to record outcome in ledger");
                Some(err.to_string())
            }
        };

        FileOutcome {
            path: signature.path,
            success: outcome.success,
            error: outcome.error,
            details: outcome.details,
            recorded: ledger_error.is_none(),
            ledger_error,
        }
    }

    /// Discover, filter and process every new file once.
    ///
    /// Never fails and never unwinds into the caller. A discovery fault or a
    /// ledger read error ends the pass before any processing. A failed ledger
    /// write ends it after the file being recorded, so no further processor
    /// call is made while outcomes cannot be persisted. Both report
    /// `success = false`.
    pub fn run_single_scan(
        &self,
        discovery: &dyn Discovery,
        processor: &mut dyn Processor,
    ) -> ScanResult {
        let started = Instant::now();
        let fresh = match self.collect_new_guarded(discovery) {
            Ok(fresh) => fresh,
            Err(err) => {
                error!(error = %err, "Scan aborted");
                return ScanResult::aborted(&err, started.elapsed());
            }
        };
        if fresh.is_empty() {
            debug!("No new files");
            return ScanResult::empty(started.elapsed());
        }

        info!(count = fresh.len(), "Found new files");
        let mut result = ScanResult {
            files_found: fresh.len(),
            success: true,
            ..ScanResult::default()
        };
        for candidate in &fresh {
            let outcome = self.process_one(candidate, processor);
            if outcome.success && outcome.recorded {
                result.files_processed += 1;
            } else {
                result.files_failed += 1;
            }
            if let Some(message) = outcome.ledger_error {
                let err = ScanError::Unrecorded {
                    path: outcome.path,
                    message,
                };
                error!(error = %err, "Scan aborted");
                result.success = false;
                result.error = Some(err.to_string());
                break;
            }
        }
        result.duration = started.elapsed();
        info!(
            processed = result.files_processed,
            failed = result.files_failed,
            elapsed_ms = result.duration.as_millis() as u64,
            "Scan complete"
        );
        result
    }

    fn collect_new_guarded(&self, discovery: &dyn Discovery) -> Result<Vec<Candidate>, ScanError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.collect_new(discovery))) {
            Ok(result) => result,
            Err(payload) => Err(ScanError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    fn collect_new(&self, discovery: &dyn Discovery) -> Result<Vec<Candidate>, ScanError> {
        let candidates = discovery.discover()?;
        debug!(count = candidates.len(), "Discovered candidates");
        Ok(self.discover_new(candidates)?)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
