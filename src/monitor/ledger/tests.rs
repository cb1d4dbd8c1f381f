use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tempfile::tempdir;

use super::*;
use crate::monitor::signature::now_millis;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn sig(path: &str, size: u64, modified_ms: i64) -> FileSignature {
    FileSignature {
        path: PathBuf::from(path),
        size,
        modified_ms,
    }
}

fn open_temp() -> (tempfile::TempDir, Ledger) {
    let dir = tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("nested").join("ledger.db")).unwrap();
    (dir, ledger)
}

#[test]
fn open_creates_parent_directory() {
    let (dir, ledger) = open_temp();
    assert!(dir.path().join("nested").is_dir());
    assert_eq!(ledger.path(), dir.path().join("nested").join("ledger.db"));
    assert_eq!(ledger.count().unwrap(), 0);
}

#[test]
fn exists_requires_full_signature_match() {
    let (_dir, ledger) = open_temp();
    let original = sig("/memos/a.m4a", 100, 1_000);
    ledger.upsert(&original, true, None).unwrap();

    assert!(ledger.exists(&original).unwrap());
    assert!(!ledger.exists(&sig("/memos/a.m4a", 101, 1_000)).unwrap());
    assert!(!ledger.exists(&sig("/memos/a.m4a", 100, 1_001)).unwrap());
    assert!(!ledger.exists(&sig("/memos/b.m4a", 100, 1_000)).unwrap());
}

#[test]
fn upsert_overwrites_row_for_same_path() {
    let (_dir, ledger) = open_temp();
    let first = sig("/memos/a.m4a", 100, 1_000);
    let second = sig("/memos/a.m4a", 250, 2_000);
    ledger.upsert(&first, true, None).unwrap();
    ledger.upsert(&second, false, Some("boom")).unwrap();

    assert_eq!(ledger.count().unwrap(), 1);
    assert!(!ledger.exists(&first).unwrap());
    assert!(ledger.exists(&second).unwrap());
    let record = ledger.lookup(Path::new("/memos/a.m4a")).unwrap().unwrap();
    assert!(record.matches(&second));
    assert!(!record.success);
    assert_eq!(record.error_message.as_deref(), Some("boom"));
}

#[test]
fn attempts_count_per_signature_and_reset_on_change() {
    let (_dir, ledger) = open_temp();
    let original = sig("/memos/a.m4a", 100, 1_000);
    ledger.upsert(&original, false, Some("first")).unwrap();
    ledger.upsert(&original, false, Some("second")).unwrap();
    let record = ledger.lookup(&original.path).unwrap().unwrap();
    assert_eq!(record.attempts, 2);
    assert_eq!(record.error_message.as_deref(), Some("second"));

    let changed = sig("/memos/a.m4a", 100, 5_000);
    ledger.upsert(&changed, true, None).unwrap();
    let record = ledger.lookup(&changed.path).unwrap().unwrap();
    assert_eq!(record.attempts, 1);
    assert!(record.success);
    assert_eq!(record.error_message, None);
}

#[test]
fn lookup_missing_path_is_none() {
    let (_dir, ledger) = open_temp();
    assert!(ledger.lookup(Path::new("/nowhere.m4a")).unwrap().is_none());
}

#[test]
fn prune_removes_only_rows_older_than_threshold() {
    let (_dir, ledger) = open_temp();
    let now = now_millis();
    ledger
        .upsert_at(&sig("/memos/old.m4a", 1, 1), true, None, now - 40 * DAY_MS)
        .unwrap();
    ledger
        .upsert_at(&sig("/memos/mid.m4a", 1, 1), true, None, now - 20 * DAY_MS)
        .unwrap();
    ledger
        .upsert_at(&sig("/memos/new.m4a", 1, 1), true, None, now - 5 * DAY_MS)
        .unwrap();

    let removed = ledger.prune(Duration::from_secs(30 * 24 * 3600)).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(ledger.count().unwrap(), 2);
    assert!(ledger.lookup(Path::new("/memos/old.m4a")).unwrap().is_none());
    assert!(ledger.lookup(Path::new("/memos/mid.m4a")).unwrap().is_some());
}

#[test]
fn recent_orders_newest_first_within_window() {
    let (_dir, ledger) = open_temp();
    let now = now_millis();
    ledger
        .upsert_at(&sig("/memos/a.m4a", 1, 1), true, None, now - 3_000)
        .unwrap();
    ledger
        .upsert_at(&sig("/memos/b.m4a", 1, 1), true, None, now - 1_000)
        .unwrap();
    ledger
        .upsert_at(&sig("/memos/c.m4a", 1, 1), false, Some("x"), now - 2 * DAY_MS)
        .unwrap();

    let recent = ledger.recent(Duration::from_secs(3600)).unwrap();
    let paths: Vec<_> = recent.iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("/memos/b.m4a"), PathBuf::from("/memos/a.m4a")]
    );

    let stats = ledger.stats(1).unwrap();
    assert_eq!(stats.total_processed, 3);
    assert_eq!(stats.processed_last_24h, 2);
    assert_eq!(stats.recent_files.len(), 1);
    assert_eq!(stats.recent_files[0].path, PathBuf::from("/memos/b.m4a"));
}

#[test]
fn forget_removes_row() {
    let (_dir, ledger) = open_temp();
    let signature = sig("/memos/a.m4a", 1, 1);
    ledger.upsert(&signature, true, None).unwrap();
    assert!(ledger.forget(&signature.path).unwrap());
    assert!(!ledger.forget(&signature.path).unwrap());
    assert!(!ledger.exists(&signature).unwrap());
}

#[test]
fn rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let signature = sig("/memos/a.m4a", 10, 20);
    {
        let ledger = Ledger::open(&path).unwrap();
        ledger.upsert(&signature, true, None).unwrap();
    }
    let reopened = Ledger::open(&path).unwrap();
    assert!(reopened.exists(&signature).unwrap());
}

#[test]
fn old_schema_gains_attempts_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE processed_files (
                path TEXT PRIMARY KEY,
                size INTEGER NOT NULL,
                modified_ms INTEGER NOT NULL,
                processed_at_ms INTEGER NOT NULL,
                success INTEGER NOT NULL,
                error_message TEXT
             );
             INSERT INTO processed_files VALUES ('/memos/a.m4a', 5, 7, 9, 1, NULL);",
        )
        .unwrap();
    }

    let ledger = Ledger::open(&path).unwrap();
    let record = ledger.lookup(Path::new("/memos/a.m4a")).unwrap().unwrap();
    assert_eq!(record.attempts, 1);
    assert!(ledger.exists(&sig("/memos/a.m4a", 5, 7)).unwrap());
}

#[test]
fn read_only_handle_sees_writes() {
    let (dir, ledger) = open_temp();
    let signature = sig("/memos/a.m4a", 1, 1);
    ledger.upsert(&signature, true, None).unwrap();

    let reader = Ledger::open_read_only(dir.path().join("nested").join("ledger.db")).unwrap();
    assert!(reader.exists(&signature).unwrap());
    assert_eq!(reader.count().unwrap(), 1);
    assert!(reader.upsert(&sig("/memos/b.m4a", 1, 1), true, None).is_err());
}

#[test]
fn schema_check_is_stable_across_reapplication() {
    let (_dir, ledger) = open_temp();
    schema::apply_schema(&ledger.connection).unwrap();
    schema::apply_schema(&ledger.connection).unwrap();

    let mut stmt = ledger
        .connection
        .prepare("PRAGMA table_info(processed_files)")
        .unwrap();
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(columns.iter().filter(|name| *name == "attempts").count(), 1);
}
