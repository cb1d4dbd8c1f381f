use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::{TempDir, tempdir};

use super::*;
use crate::monitor::discovery::{Candidate, DiscoveryError};
use crate::monitor::ledger::Ledger;
use crate::monitor::processor::{ProcessError, ProcessOutcome, Processor};
use crate::monitor::readiness::ReadinessFilter;
use crate::monitor::signature::FileSignature;

const DAY: Duration = Duration::from_secs(24 * 3600);

struct Fixture {
    dir: TempDir,
    ledger: Ledger,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("ledger.db")).unwrap();
        Self { dir, ledger }
    }

    fn scanner(&self) -> Scanner<'_> {
        self.scanner_with_attempts(1)
    }

    fn scanner_with_attempts(&self, max_attempts: u32) -> Scanner<'_> {
        let readiness = ReadinessFilter::new(Duration::from_secs(30), 7 * DAY);
        Scanner::new(&self.ledger, readiness, max_attempts)
    }

    fn recording(&self, name: &str, age: Duration) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        set_age(&path, age);
        path
    }
}

fn set_age(path: &Path, age: Duration) {
    let mtime = FileTime::from_system_time(SystemTime::now() - age);
    filetime::set_file_mtime(path, mtime).unwrap();
}

fn candidates(paths: &[&PathBuf]) -> Vec<Candidate> {
    paths
        .iter()
        .map(|path| Candidate::from_path(path).unwrap())
        .collect()
}

fn names(found: &[Candidate]) -> Vec<String> {
    found
        .iter()
        .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn succeed(_: &Path) -> ProcessOutcome {
    ProcessOutcome::succeeded()
}

struct FaultyProcessor;

impl Processor for FaultyProcessor {
    fn process(&mut self, _path: &Path) -> Result<ProcessOutcome, ProcessError> {
        Err(ProcessError::Other("backend unreachable".into()))
    }
}

#[test]
fn only_files_inside_age_window_are_new() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let b = fx.recording("B.m4a", Duration::from_secs(10));
    let c = fx.recording("C.m4a", 9 * DAY);

    let found = fx.scanner().discover_new(candidates(&[&a, &b, &c])).unwrap();
    assert_eq!(names(&found), vec!["A.m4a".to_string()]);
}

#[test]
fn discover_new_preserves_input_order() {
    let fx = Fixture::new();
    let older = fx.recording("older.m4a", Duration::from_secs(600));
    let newer = fx.recording("newer.m4a", Duration::from_secs(60));

    let found = fx
        .scanner()
        .discover_new(candidates(&[&older, &newer]))
        .unwrap();
    assert_eq!(
        names(&found),
        vec!["older.m4a".to_string(), "newer.m4a".to_string()]
    );
}

#[test]
fn processed_file_is_not_offered_again() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let scanner = fx.scanner();

    let found = scanner.discover_new(candidates(&[&a])).unwrap();
    let outcome = scanner.process_one(&found[0], &mut succeed);
    assert!(outcome.success);
    assert!(outcome.recorded);

    let signature = FileSignature::from_path(&a).unwrap();
    assert!(fx.ledger.exists(&signature).unwrap());
    assert!(scanner.discover_new(candidates(&[&a])).unwrap().is_empty());
}

#[test]
fn changed_file_is_reprocessed_and_row_overwritten() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(120));
    let scanner = fx.scanner();
    let found = scanner.discover_new(candidates(&[&a])).unwrap();
    scanner.process_one(&found[0], &mut succeed);

    set_age(&a, Duration::from_secs(60));
    let found = scanner.discover_new(candidates(&[&a])).unwrap();
    assert_eq!(found.len(), 1);
    scanner.process_one(&found[0], &mut succeed);

    assert_eq!(fx.ledger.count().unwrap(), 1);
    let record = fx.ledger.lookup(&found[0].path).unwrap().unwrap();
    assert!(record.matches(&FileSignature::from_path(&a).unwrap()));
}

#[test]
fn failing_file_does_not_stop_the_scan() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let b = fx.recording("B.m4a", Duration::from_secs(50));
    let listed = candidates(&[&a, &b]);
    let discovery = move || -> Result<Vec<Candidate>, DiscoveryError> { Ok(listed.clone()) };

    let attempted = RefCell::new(Vec::new());
    let mut processor = |path: &Path| {
        attempted.borrow_mut().push(path.to_path_buf());
        if path.ends_with("A.m4a") {
            panic!("decoder crashed");
        }
        ProcessOutcome::succeeded()
    };

    let result = fx.scanner().run_single_scan(&discovery, &mut processor);
    assert!(result.success);
    assert_eq!(result.files_found, 2);
    assert_eq!(result.files_processed, 1);
    assert_eq!(result.files_failed, 1);
    assert_eq!(attempted.borrow().len(), 2);

    let record = fx.ledger.lookup(&attempted.borrow()[0]).unwrap().unwrap();
    assert!(!record.success);
    assert!(record.error_message.unwrap().contains("decoder crashed"));

    let again = fx.scanner().run_single_scan(&discovery, &mut processor);
    assert_eq!(again.files_found, 0);
    assert!(again.success);
}

#[test]
fn processor_fault_is_recorded_as_failure() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let found = fx.scanner().discover_new(candidates(&[&a])).unwrap();

    let outcome = fx.scanner().process_one(&found[0], &mut FaultyProcessor);
    assert!(!outcome.success);
    assert!(outcome.recorded);
    let record = fx.ledger.lookup(&found[0].path).unwrap().unwrap();
    assert!(!record.success);
    assert_eq!(
        record.error_message.as_deref(),
        Some("Processor error: backend unreachable")
    );
}

#[test]
fn vanished_file_writes_no_ledger_row() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let found = fx.scanner().discover_new(candidates(&[&a])).unwrap();
    std::fs::remove_file(&a).unwrap();

    let called = RefCell::new(false);
    let mut processor = |_: &Path| {
        *called.borrow_mut() = true;
        ProcessOutcome::succeeded()
    };
    let outcome = fx.scanner().process_one(&found[0], &mut processor);
    assert!(!outcome.success);
    assert!(!outcome.recorded);
    assert!(!*called.borrow());
    assert_eq!(fx.ledger.count().unwrap(), 0);
}

#[test]
fn empty_discovery_is_a_successful_no_op() {
    let fx = Fixture::new();
    let discovery = || -> Result<Vec<Candidate>, DiscoveryError> { Ok(Vec::new()) };
    let result = fx.scanner().run_single_scan(&discovery, &mut succeed);
    assert!(result.success);
    assert_eq!(result.files_found, 0);
    assert_eq!(result.files_processed, 0);
    assert_eq!(result.files_failed, 0);
    assert!(result.error.is_none());
}

#[test]
fn discovery_failure_marks_scan_unsuccessful() {
    let fx = Fixture::new();
    let discovery = || -> Result<Vec<Candidate>, DiscoveryError> {
        Err(DiscoveryError::NoHomeDir {
            pattern: "~/memos".into(),
        })
    };
    let result = fx.scanner().run_single_scan(&discovery, &mut succeed);
    assert!(!result.success);
    assert!(result.error.unwrap().contains("~/memos"));
    assert_eq!(fx.ledger.count().unwrap(), 0);
}

#[test]
fn failed_files_are_retried_up_to_max_attempts() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let listed = candidates(&[&a]);
    let discovery = move || -> Result<Vec<Candidate>, DiscoveryError> { Ok(listed.clone()) };
    let scanner = fx.scanner_with_attempts(3);
    let mut failing = |_: &Path| ProcessOutcome::failed("transcription timed out");

    for attempt in 1..=3u32 {
        let result = scanner.run_single_scan(&discovery, &mut failing);
        assert_eq!(result.files_failed, 1, "attempt {attempt}");
        let record = fx.ledger.lookup(&a).unwrap().unwrap();
        assert_eq!(record.attempts, attempt);
    }
    let result = scanner.run_single_scan(&discovery, &mut failing);
    assert_eq!(result.files_found, 0);
}

#[test]
fn retry_policy_stops_after_success() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let listed = candidates(&[&a]);
    let discovery = move || -> Result<Vec<Candidate>, DiscoveryError> { Ok(listed.clone()) };
    let scanner = fx.scanner_with_attempts(3);

    let mut calls = 0;
    let mut flaky = |_: &Path| {
        calls += 1;
        if calls == 1 {
            ProcessOutcome::failed("busy")
        } else {
            ProcessOutcome::succeeded()
        }
    };
    assert_eq!(scanner.run_single_scan(&discovery, &mut flaky).files_failed, 1);
    assert_eq!(scanner.run_single_scan(&discovery, &mut flaky).files_processed, 1);
    assert_eq!(scanner.run_single_scan(&discovery, &mut flaky).files_found, 0);
}

fn read_only_ledger(fx: &Fixture) -> Ledger {
    Ledger::open_read_only(fx.dir.path().join("ledger.db")).unwrap()
}

#[test]
fn ledger_write_failure_is_reported_on_the_file() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let reader = read_only_ledger(&fx);
    let readiness = ReadinessFilter::new(Duration::from_secs(30), 7 * DAY);
    let scanner = Scanner::new(&reader, readiness, 1);

    let found = scanner.discover_new(candidates(&[&a])).unwrap();
    let outcome = scanner.process_one(&found[0], &mut succeed);
    assert!(outcome.success);
    assert!(!outcome.recorded);
    assert!(outcome.ledger_error.is_some());
    assert_eq!(fx.ledger.count().unwrap(), 0);
}

#[test]
fn ledger_write_failure_stops_the_scan() {
    let fx = Fixture::new();
    let a = fx.recording("A.m4a", Duration::from_secs(45));
    let b = fx.recording("B.m4a", Duration::from_secs(50));
    let listed = candidates(&[&a, &b]);
    let discovery = move || -> Result<Vec<Candidate>, DiscoveryError> { Ok(listed.clone()) };
    let reader = read_only_ledger(&fx);
    let readiness = ReadinessFilter::new(Duration::from_secs(30), 7 * DAY);
    let scanner = Scanner::new(&reader, readiness, 1);

    let mut calls = 0;
    let mut processor = |_: &Path| {
        calls += 1;
        ProcessOutcome::succeeded()
    };
    let result = scanner.run_single_scan(&discovery, &mut processor);

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Could not record outcome"));
    assert_eq!(result.files_found, 2);
    assert_eq!(result.files_processed, 0);
    assert_eq!(result.files_failed, 1);
    assert_eq!(calls, 1);
    assert_eq!(fx.ledger.count().unwrap(), 0);
}

#[test]
fn panicking_discovery_fails_the_scan_without_unwinding() {
    let fx = Fixture::new();
    let discovery = || -> Result<Vec<Candidate>, DiscoveryError> {
        panic!("enumeration blew up");
    };
    let result = fx.scanner().run_single_scan(&discovery, &mut succeed);
    assert!(!result.success);
    assert_eq!(result.files_found, 0);
    assert!(result.error.unwrap().contains("enumeration blew up"));
}
