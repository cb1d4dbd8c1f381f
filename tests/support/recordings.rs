use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;

/// Write a fake recording whose modification time lies `age` in the past.
pub fn write_recording(dir: &Path, name: &str, age: Duration) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create recording dir");
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).expect("write recording");
    set_age(&path, age);
    path
}

pub fn set_age(path: &Path, age: Duration) {
    let mtime = FileTime::from_system_time(SystemTime::now() - age);
    filetime::set_file_mtime(path, mtime).expect("set recording mtime");
}
