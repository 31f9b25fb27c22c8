//! Option and report types for the public cache API
//!
//! Defines the per-call options and the serializable snapshots handed back
//! to callers and subscribers.

pub mod info;
pub mod options;

// Re-export commonly used types
pub use info::{CacheEvent, ChangeKind, ChangeOrigin, StorageInfo};
pub use options::{GetOptions, SetOptions};
