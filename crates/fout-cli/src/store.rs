//! Marker store backed by a single JSON file.
//!
//! Writers serialize on a `<file>.lock` sibling created with `create_new`,
//! and replace the file through a `<file>.tmp` rename, so concurrent saves
//! for different keys never drop each other's markers.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fout_core::{Persistence, StorageError};
use log::warn;
use serde::{Deserialize, Serialize};

/// How long a writer waits for another writer's lock.
const LOCK_WAIT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(5);
/// Lock files older than this were left by a killed writer.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);

/// One stored marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub value: String,
    pub written_at: DateTime<Utc>,
}

/// `{ "<key>": { "value": "1", "written_at": "..." }, ... }` on disk.
///
/// The file is re-read on every access so separate invocations always see
/// each other's writes.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

/// Held while a writer owns the store; removes the lock file on drop.
struct StoreLock {
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn lock_is_stale(lock_path: &Path) -> bool {
    fs::metadata(lock_path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > LOCK_STALE_AFTER)
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/fout/markers.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("fout").join("markers.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_text(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    /// All markers, keyed by storage key. A missing file is an empty store.
    pub fn records(&self) -> Result<BTreeMap<String, MarkerRecord>> {
        match self.read_text()? {
            Some(text) => serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", self.path.display())),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Like [`records`](Self::records), but a file that does not parse is
    /// logged and treated as empty so the next save replaces it.
    pub fn records_or_empty(&self) -> Result<BTreeMap<String, MarkerRecord>> {
        let Some(text) = self.read_text()? else {
            return Ok(BTreeMap::new());
        };
        match serde_json::from_str(&text) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("[fout] discarding unreadable {}: {e}", self.path.display());
                Ok(BTreeMap::new())
            }
        }
    }

    fn acquire_lock(&self) -> Result<StoreLock> {
        let lock_path = append_suffix(&self.path, ".lock");
        let deadline = Instant::now() + LOCK_WAIT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(StoreLock { path: lock_path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(&lock_path) {
                        warn!("[fout] removing stale lock {}", lock_path.display());
                        let _ = fs::remove_file(&lock_path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        bail!("timed out waiting for {}", lock_path.display());
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("creating {}", lock_path.display()))
                }
            }
        }
    }

    fn write_records(&self, records: &BTreeMap<String, MarkerRecord>) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        let tmp = append_suffix(&self.path, ".tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))
    }

    /// Insert one marker under the store lock, keeping every other marker.
    fn insert(&self, key: &str, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let _lock = self.acquire_lock()?;
        let mut records = self.records_or_empty()?;
        records.insert(
            key.to_string(),
            MarkerRecord {
                value: value.to_string(),
                written_at: Utc::now(),
            },
        );
        self.write_records(&records)
    }
}

impl Persistence for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let records = self.records().map_err(|e| StorageError::new(key, format!("{e:#}")))?;
        Ok(records.get(key).map(|r| r.value.clone()))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value)
            .map_err(|e| StorageError::new(key, format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("markers.json"));
        assert_eq!(store.load("fout-loader__Inter").unwrap(), None);
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn save_creates_parent_dirs_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("markers.json");
        let store = JsonFileStore::new(&path);
        store.save("fout-loader__Inter", "1").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load("fout-loader__Inter").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.load("fout-loader__Roboto").unwrap(), None);
    }

    #[test]
    fn save_keeps_other_markers() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("markers.json"));
        store.save("a", "1").unwrap();
        store.save("b", "1").unwrap();

        let records = store.records().unwrap();
        assert_eq!(records.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(records["a"].written_at <= records["b"].written_at);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.json");
        fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::new(&path).load("k").unwrap_err();
        assert_eq!(err.key, "k");
        assert!(err.message.contains("parsing"));
    }

    #[test]
    fn concurrent_saves_keep_every_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.json");

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    JsonFileStore::new(path)
                        .save(&format!("fout-loader__Font{i}"), "1")
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let records = JsonFileStore::new(&path).records().unwrap();
        assert_eq!(records.len(), 16);
        assert!(!append_suffix(&path, ".lock").exists());
        assert!(!append_suffix(&path, ".tmp").exists());
    }

    #[test]
    fn save_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.records_or_empty().unwrap().is_empty());
        store.save("fout-loader__Inter", "1").unwrap();
        assert_eq!(store.load("fout-loader__Inter").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markers.json");
        let lock = append_suffix(&path, ".lock");
        fs::write(&lock, "999999").unwrap();
        let old = SystemTime::now() - LOCK_STALE_AFTER - Duration::from_secs(5);
        fs::File::options()
            .write(true)
            .open(&lock)
            .unwrap()
            .set_modified(old)
            .unwrap();

        JsonFileStore::new(&path).save("k", "1").unwrap();
        assert!(!lock.exists());
    }
}
