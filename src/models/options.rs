//! Call Options
//!
//! Per-call settings for reads and writes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Validator;

/// Options for [`PersistentCache::get`](crate::cache::PersistentCache::get).
///
/// # Fields
/// - `ttl`: TTL applied to writes made through the returned binding
/// - `validate`: shape check run after every decode of this binding's value
pub struct GetOptions<T> {
    pub ttl: Option<Duration>,
    pub validate: Option<Validator<T>>,
}

impl<T> GetOptions<T> {
    pub fn new() -> Self {
        Self {
            ttl: None,
            validate: None,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }
}

impl<T> Default for GetOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for GetOptions<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            validate: self.validate.clone(),
        }
    }
}

impl<T> fmt::Debug for GetOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetOptions")
            .field("ttl", &self.ttl)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Options for writes.
///
/// Unset fields fall back to the cache configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// TTL for the written entry
    pub ttl: Option<Duration>,
    /// Whether the quota guard may evict to make room
    pub auto_reclaim: Option<bool>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn auto_reclaim(mut self, enabled: bool) -> Self {
        self.auto_reclaim = Some(enabled);
        self
    }
}
