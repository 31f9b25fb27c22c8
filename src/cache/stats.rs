//! Cache Statistics Module
//!
//! Tracks engine activity: hits, misses, self-healed corruption, expiry,
//! eviction, rejected writes and externally applied changes.

use serde::Serialize;

// == Cache Stats ==
/// Per-process counters. Not shared with other processes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served from a valid backend entry
    pub hits: u64,
    /// Reads that fell back to the caller default
    pub misses: u64,
    /// Entries purged because they failed to decode or validate
    pub corruptions: u64,
    /// Entries deleted because their TTL elapsed
    pub expirations: u64,
    /// Entries deleted by the eviction policy
    pub evictions: u64,
    /// Writes rejected by the quota guard
    pub quota_rejections: u64,
    /// Writes kept in memory only because the backend was unavailable
    pub degraded_writes: u64,
    /// Notifications from other processes applied to local bindings
    pub external_updates: u64,
    /// Live bindings in this process
    pub live_bindings: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_corruption(&mut self) {
        self.corruptions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// Adds `count` evicted entries.
    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_quota_rejection(&mut self) {
        self.quota_rejections += 1;
    }

    pub fn record_degraded_write(&mut self) {
        self.degraded_writes += 1;
    }

    pub fn record_external_update(&mut self) {
        self.external_updates += 1;
    }

    pub fn set_live_bindings(&mut self, count: usize) {
        self.live_bindings = count;
    }
}
