//! Storage Cache - A persistent key/value cache over shared storage
//!
//! Provides typed bindings with TTL expiry, quota-aware writes, corruption
//! self-healing and best-effort sync between processes sharing one backend.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use cache::{Binding, BindingState, CacheKey, PersistentCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use models::{GetOptions, SetOptions, StorageInfo};
pub use storage::{FileBackend, MemoryBackend, SharedMemory, StorageBackend};
pub use tasks::{spawn_sweep_task, spawn_sync_task};
