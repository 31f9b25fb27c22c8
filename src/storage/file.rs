//! File Backend
//!
//! Persists every entry in one JSON document inside a directory. The document
//! is re-read on every operation so separate OS processes pointing at the same
//! directory observe each other's writes. Mutations hold an exclusive lock on
//! a sidecar lock file for the whole read-modify-write and publish through a
//! uniquely named temp file, so writers of different keys never drop each
//! other's entries. There is no native change signal.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::storage::{entry_size, ProcessId, StorageBackend, StorageEvent, StorageUsage};

const STORAGE_FILE: &str = "storage.json";
const LOCK_FILE: &str = "storage.lock";

/// Directory-backed storage with a fixed capacity.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    path: PathBuf,
    lock_path: PathBuf,
    capacity: Option<u64>,
    pid: ProcessId,
}

impl FileBackend {
    /// Opens (creating if needed) the storage directory.
    pub fn open(dir: impl AsRef<Path>, capacity: Option<u64>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| {
            CacheError::Unavailable(format!("cannot open {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            path: dir.join(STORAGE_FILE),
            lock_path: dir.join(LOCK_FILE),
            capacity,
            pid: ProcessId(u64::from(std::process::id())),
        })
    }

    /// Location of the storage document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).or_else(|e| {
            // A damaged document is unrecoverable as a whole; start over.
            warn!(path = %self.path.display(), error = %e, "storage document unreadable, resetting");
            Ok(BTreeMap::new())
        })
    }

    /// Blocks until this handle holds the exclusive lock. Released when the
    /// returned file is dropped.
    fn lock(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        file.lock()?;
        Ok(file)
    }

    /// Must be called with the lock held.
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let contents =
            serde_json::to_string(entries).map_err(|e| CacheError::Io(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| CacheError::from(e.error))?;
        Ok(())
    }
}

fn used_units(entries: &BTreeMap<String, String>) -> u64 {
    entries.iter().map(|(k, v)| entry_size(k, v)).sum()
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let _lock = self.lock()?;
        let mut entries = self.load()?;
        let old_size = entries
            .get(key)
            .map(|old| entry_size(key, old))
            .unwrap_or(0);
        let new_size = entry_size(key, value);
        let used = used_units(&entries);

        if let Some(capacity) = self.capacity {
            if used - old_size + new_size > capacity {
                return Err(CacheError::QuotaExceeded {
                    required: new_size,
                    available: capacity.saturating_sub(used - old_size),
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)?;
        debug!(key, size = new_size, "file backend write");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _lock = self.lock()?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
            debug!(key, "file backend delete");
        }
        Ok(())
    }

    fn enumerate(&self) -> Result<Vec<(String, String)>> {
        Ok(self.load()?.into_iter().collect())
    }

    fn estimate_usage(&self) -> Result<StorageUsage> {
        Ok(StorageUsage {
            used: used_units(&self.load()?),
            capacity: self.capacity,
        })
    }

    fn process_id(&self) -> ProcessId {
        self.pid
    }

    fn subscribe(&self) -> Option<UnboundedReceiver<StorageEvent>> {
        None
    }
}
