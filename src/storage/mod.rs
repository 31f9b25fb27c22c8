//! Storage Backend Module
//!
//! Adapter contract over the shared, synchronous, capacity-limited key/value
//! store that every cache process writes into.

mod file;
mod memory;

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::Result;

pub use file::FileBackend;
pub use memory::{MemoryBackend, SharedMemory};

// == Process Identity ==
/// Identifies one process (tab, window, OS process) attached to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

// == Change Notification ==
/// Change notification emitted by the backend to other processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed
    pub key: String,
    /// Previous raw payload, if any
    pub old_value: Option<String>,
    /// New raw payload, `None` when the key was deleted
    pub new_value: Option<String>,
    /// Process whose write produced the event
    pub origin: ProcessId,
}

// == Usage ==
/// Current backend usage in backend size units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    /// Units occupied by all entries
    pub used: u64,
    /// Total capacity, `None` = unbounded
    pub capacity: Option<u64>,
}

impl StorageUsage {
    /// Units still free, `None` when unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.capacity.map(|cap| cap.saturating_sub(self.used))
    }
}

// == Backend Trait ==
/// Synchronous key/value backend shared by every process.
///
/// Implementations never retry. A failed `write` leaves the previous payload
/// in place. Notifications are produced by the backend itself and are only
/// delivered to processes other than the writer.
pub trait StorageBackend: Send + Sync {
    /// Reads the raw payload for `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, replacing any previous payload.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Lists every stored entry.
    fn enumerate(&self) -> Result<Vec<(String, String)>>;

    /// Reports used units and capacity.
    fn estimate_usage(&self) -> Result<StorageUsage>;

    /// Identity of the process this handle belongs to.
    fn process_id(&self) -> ProcessId;

    /// Opens the backend's change-notification channel, if it has one.
    fn subscribe(&self) -> Option<UnboundedReceiver<StorageEvent>>;
}

// == Size Estimation ==
/// Size of one entry in UTF-16 code units (key + payload).
///
/// Backends and the quota guard must agree on this unit.
pub fn entry_size(key: &str, value: &str) -> u64 {
    (key.encode_utf16().count() + value.encode_utf16().count()) as u64
}
