//! The ingestion pipeline: discovery, readiness, ledger dedupe, processing and
//! the polling loop that drives them.

pub mod discovery;
pub mod ledger;
pub mod processor;
pub mod readiness;
pub mod scan;
pub mod signature;
mod run_loop;
mod stop_signal;

pub use discovery::{Candidate, Discovery, DiscoveryError, GlobDiscovery};
pub use ledger::{Ledger, LedgerError, LedgerRecord, LedgerStats};
pub use processor::{
    CommandProcessor, DryRunProcessor, ProcessError, ProcessOutcome, Processor,
    processor_from_config,
};
pub use readiness::{Readiness, ReadinessFilter};
pub use run_loop::{
    Monitor, MonitorError, MonitorHandle, MonitorStatus, STATUS_RECENT_FILES, StatusConfig,
};
pub use scan::{FileOutcome, ScanError, ScanResult, Scanner};
pub use signature::{FileSignature, SignatureError, format_millis, now_millis};
pub use stop_signal::StopSignal;
