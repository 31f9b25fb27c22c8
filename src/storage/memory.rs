//! In-Memory Shared Backend
//!
//! Simulates one storage area shared by several processes. Every handle from
//! [`SharedMemory::connect`] acts as a separate process: its writes are
//! delivered as [`StorageEvent`]s to the subscribers of all other handles.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::storage::{entry_size, ProcessId, StorageBackend, StorageEvent, StorageUsage};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    used: u64,
    capacity: Option<u64>,
    available: bool,
    next_process: u64,
    subscribers: Vec<(ProcessId, UnboundedSender<StorageEvent>)>,
}

impl Inner {
    fn notify(&mut self, event: StorageEvent) {
        // Closed receivers are dropped on the next broadcast.
        self.subscribers
            .retain(|(pid, tx)| *pid == event.origin || tx.send(event.clone()).is_ok());
    }
}

// == Shared Storage Area ==
/// The shared storage area itself. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SharedMemory {
    inner: Arc<Mutex<Inner>>,
}

impl SharedMemory {
    /// Creates a storage area with the given capacity, `None` = unbounded.
    pub fn new(capacity: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                available: true,
                ..Inner::default()
            })),
        }
    }

    /// Attaches a new process to the storage area.
    pub fn connect(&self) -> MemoryBackend {
        let mut inner = lock(&self.inner);
        inner.next_process += 1;
        MemoryBackend {
            inner: Arc::clone(&self.inner),
            pid: ProcessId(inner.next_process),
        }
    }

    /// Enables or disables the storage area, as a host may do.
    pub fn set_available(&self, available: bool) {
        lock(&self.inner).available = available;
    }

    /// Changes the capacity.
    pub fn set_capacity(&self, capacity: Option<u64>) {
        lock(&self.inner).capacity = capacity;
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Process Handle ==
/// One process's handle on a [`SharedMemory`] area.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
    pid: ProcessId,
}

impl MemoryBackend {
    /// Standalone single-process backend.
    pub fn new(capacity: Option<u64>) -> Self {
        SharedMemory::new(capacity).connect()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = lock(&self.inner);
        if !inner.available {
            return Err(CacheError::Unavailable(
                "storage disabled by host".to_string(),
            ));
        }
        Ok(inner)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.guard()?.entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.guard()?;

        let old_size = inner
            .entries
            .get(key)
            .map(|old| entry_size(key, old))
            .unwrap_or(0);
        let new_size = entry_size(key, value);
        let used_after = inner.used - old_size + new_size;

        if let Some(capacity) = inner.capacity {
            if used_after > capacity {
                return Err(CacheError::QuotaExceeded {
                    required: new_size,
                    available: capacity.saturating_sub(inner.used - old_size),
                });
            }
        }

        let old_value = inner.entries.insert(key.to_string(), value.to_string());
        inner.used = used_after;
        debug!(process = %self.pid, key, size = new_size, "backend write");

        inner.notify(StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
            origin: self.pid,
        });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.guard()?;
        if let Some(old) = inner.entries.remove(key) {
            inner.used -= entry_size(key, &old);
            debug!(process = %self.pid, key, "backend delete");
            inner.notify(StorageEvent {
                key: key.to_string(),
                old_value: Some(old),
                new_value: None,
                origin: self.pid,
            });
        }
        Ok(())
    }

    fn enumerate(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .guard()?
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn estimate_usage(&self) -> Result<StorageUsage> {
        let inner = self.guard()?;
        Ok(StorageUsage {
            used: inner.used,
            capacity: inner.capacity,
        })
    }

    fn process_id(&self) -> ProcessId {
        self.pid
    }

    fn subscribe(&self) -> Option<UnboundedReceiver<StorageEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner).subscribers.push((self.pid, tx));
        Some(rx)
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
