//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Storage backend is disabled by the host
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Write would exceed the backend capacity
    #[error("Quota exceeded: entry needs {required} units, {available} available")]
    QuotaExceeded { required: u64, available: u64 },

    /// Stored payload could not be decoded or failed validation
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// Caller value could not be encoded
    #[error("Serialize failure: {0}")]
    SerializeFailure(String),

    /// Key not present in the backend
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Backend I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl CacheError {
    /// Short stable label, used for log fields and stats.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Unavailable(_) => "unavailable",
            CacheError::QuotaExceeded { .. } => "quota_exceeded",
            CacheError::Corrupt(_) => "corrupt",
            CacheError::SerializeFailure(_) => "serialize_failure",
            CacheError::NotFound(_) => "not_found",
            CacheError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
