//! Quota Guard Module
//!
//! Checks that a pending write fits in the backend before it is attempted,
//! optionally reclaiming space through the eviction policy. Writes are
//! all-or-nothing: a rejected write leaves the backend untouched.

use tracing::{debug, warn};

use crate::cache::eviction::{self, EvictionReport};
use crate::error::{CacheError, Result};
use crate::storage::{entry_size, StorageBackend};

/// Units still usable by a write of `key`, counting the space its current
/// payload would release.
fn available_for(backend: &dyn StorageBackend, key: &str) -> Result<Option<u64>> {
    let usage = backend.estimate_usage()?;
    let Some(capacity) = usage.capacity else {
        return Ok(None);
    };
    let existing = backend
        .read(key)?
        .map(|old| entry_size(key, &old))
        .unwrap_or(0);
    Ok(Some(
        capacity.saturating_sub(usage.used.saturating_sub(existing)),
    ))
}

// == Ensure Capacity ==
/// Verifies `blob` fits under `key`, evicting if `auto_reclaim` allows.
///
/// `on_evicted` runs as soon as a reclamation pass deleted entries, before
/// the outcome of the check is known, so callers learn about every eviction
/// even when the write is rejected afterwards.
pub fn ensure_capacity<F>(
    backend: &dyn StorageBackend,
    key: &str,
    blob: &str,
    auto_reclaim: bool,
    on_evicted: F,
) -> Result<()>
where
    F: FnOnce(&EvictionReport),
{
    let required = entry_size(key, blob);

    let Some(available) = available_for(backend, key)? else {
        return Ok(());
    };
    if required <= available {
        return Ok(());
    }

    if !auto_reclaim {
        warn!(key, required, available, "write rejected by quota guard");
        return Err(CacheError::QuotaExceeded {
            required,
            available,
        });
    }

    let deficit = required - available;
    let reclaimable: u64 = eviction::candidates(backend)?
        .iter()
        .filter(|candidate| candidate.key != key)
        .map(|candidate| candidate.size)
        .sum();
    if reclaimable < deficit {
        warn!(
            key,
            required,
            available,
            reclaimable,
            "write rejected; eviction cannot free enough"
        );
        return Err(CacheError::QuotaExceeded {
            required,
            available,
        });
    }

    debug!(key, deficit, "reclaiming space before write");
    let report = eviction::reclaim(backend, deficit, Some(key))?;
    if !report.removed.is_empty() {
        on_evicted(&report);
    }

    // One retry only.
    let available = available_for(backend, key)?.unwrap_or(u64::MAX);
    if required > available {
        warn!(
            key,
            required,
            available,
            freed = report.freed,
            "write rejected after reclamation"
        );
        return Err(CacheError::QuotaExceeded {
            required,
            available,
        });
    }
    Ok(())
}

/// Runs the guard and then writes. The backend's own quota rejection is
/// passed through unchanged; evictions already made are still reported.
pub fn guarded_write<F>(
    backend: &dyn StorageBackend,
    key: &str,
    blob: &str,
    auto_reclaim: bool,
    on_evicted: F,
) -> Result<()>
where
    F: FnOnce(&EvictionReport),
{
    ensure_capacity(backend, key, blob, auto_reclaim, on_evicted)?;
    backend.write(key, blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, ProcessId, StorageEvent, StorageUsage};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn timed(ts: u64) -> String {
        format!(r#"{{"value":"x","__ttl":{}}}"#, ts)
    }

    fn ignore(_: &EvictionReport) {}

    /// Delegates to a memory backend but fails every write of `key`.
    struct FailingWrite {
        inner: MemoryBackend,
        key: &'static str,
    }

    impl StorageBackend for FailingWrite {
        fn read(&self, key: &str) -> Result<Option<String>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<()> {
            if key == self.key {
                return Err(CacheError::Io("disk full".to_string()));
            }
            self.inner.write(key, value)
        }

        fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key)
        }

        fn enumerate(&self) -> Result<Vec<(String, String)>> {
            self.inner.enumerate()
        }

        fn estimate_usage(&self) -> Result<StorageUsage> {
            self.inner.estimate_usage()
        }

        fn process_id(&self) -> ProcessId {
            self.inner.process_id()
        }

        fn subscribe(&self) -> Option<UnboundedReceiver<StorageEvent>> {
            None
        }
    }

    #[test]
    fn test_unbounded_backend_always_fits() {
        let backend = MemoryBackend::new(None);
        let blob = "x".repeat(10_000);

        assert!(ensure_capacity(&backend, "k", &blob, false, ignore).is_ok());
    }

    #[test]
    fn test_rejects_without_reclaim_and_leaves_backend() {
        let backend = MemoryBackend::new(Some(30));
        backend.write("old", &timed(1)).unwrap();

        let blob = "y".repeat(20);
        let result = guarded_write(&backend, "new", &blob, false, ignore);

        assert!(matches!(result, Err(CacheError::QuotaExceeded { .. })));
        assert!(backend.read("new").unwrap().is_none());
        assert!(backend.read("old").unwrap().is_some());
    }

    #[test]
    fn test_reclaims_deficit_then_writes() {
        let backend = MemoryBackend::new(Some(60));
        backend.write("a", &timed(1)).unwrap();
        backend.write("b", &timed(2)).unwrap();

        // 24 units each; 48 used, 12 free
        let blob = "z".repeat(20);
        let mut removed = Vec::new();
        guarded_write(&backend, "new", &blob, true, |report| {
            removed = report.removed.clone()
        })
        .unwrap();

        assert_eq!(removed, vec!["a"]);
        assert!(backend.read("b").unwrap().is_some());
        assert_eq!(backend.read("new").unwrap(), Some(blob));
    }

    #[test]
    fn test_reclaim_cannot_free_untimed_entries() {
        let backend = MemoryBackend::new(Some(40));
        backend.write("pinned", r#"{"value":"keep-me-please"}"#).unwrap();

        let blob = "y".repeat(20);
        let result = guarded_write(&backend, "new", &blob, true, ignore);

        assert!(matches!(result, Err(CacheError::QuotaExceeded { .. })));
        assert!(backend.read("pinned").unwrap().is_some());
    }

    #[test]
    fn test_insufficient_reclaim_evicts_nothing() {
        let backend = MemoryBackend::new(Some(60));
        backend.write("a", &timed(1)).unwrap();
        backend.write("b", &timed(2)).unwrap();

        let blob = "w".repeat(80);
        let mut called = false;
        let result = guarded_write(&backend, "new", &blob, true, |_| called = true);

        assert!(matches!(result, Err(CacheError::QuotaExceeded { .. })));
        assert!(!called);
        assert!(backend.read("a").unwrap().is_some());
        assert!(backend.read("b").unwrap().is_some());
    }

    #[test]
    fn test_evictions_reported_when_write_then_fails() {
        let backend = FailingWrite {
            inner: MemoryBackend::new(Some(60)),
            key: "new",
        };
        backend.write("a", &timed(1)).unwrap();
        backend.write("b", &timed(2)).unwrap();

        let blob = "z".repeat(20);
        let mut removed = Vec::new();
        let result = guarded_write(&backend, "new", &blob, true, |report| {
            removed = report.removed.clone()
        });

        assert!(matches!(result, Err(CacheError::Io(_))));
        assert_eq!(removed, vec!["a"]);
        assert!(backend.read("a").unwrap().is_none());
    }

    #[test]
    fn test_overwrite_counts_released_space() {
        let backend = MemoryBackend::new(Some(12));
        backend.write("k", "0123456789").unwrap();

        // 11 used; the overwrite frees its own 11
        assert!(ensure_capacity(&backend, "k", "abcdefghij", false, ignore).is_ok());
    }
}
