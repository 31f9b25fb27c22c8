//! Eviction Policy Module
//!
//! Frees backend space by deleting TTL-bearing entries nearest to expiry
//! first. Entries without a TTL are never touched. Access recency is not
//! tracked, so this is not an LRU.

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::Envelope;
use crate::error::Result;
use crate::storage::{entry_size, StorageBackend};

// == Eviction Candidate ==
/// A TTL-bearing entry that the policy may delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionCandidate {
    pub key: String,
    pub expires_at: u64,
    pub size: u64,
}

// == Eviction Report ==
/// Outcome of one reclamation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Units released
    pub freed: u64,
    /// Keys deleted, in deletion order
    pub removed: Vec<String>,
}

// == Candidates ==
/// Lists evictable entries ordered by expiry (earliest first, ties by key).
///
/// Payloads that do not parse as envelopes are skipped.
pub fn candidates(backend: &dyn StorageBackend) -> Result<Vec<EvictionCandidate>> {
    let mut found: Vec<EvictionCandidate> = backend
        .enumerate()?
        .into_iter()
        .filter_map(|(key, raw)| {
            let expires_at = Envelope::parse(&raw).ok()?.expires_at?;
            let size = entry_size(&key, &raw);
            Some(EvictionCandidate {
                key,
                expires_at,
                size,
            })
        })
        .collect();

    found.sort_by(|a, b| {
        a.expires_at
            .cmp(&b.expires_at)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(found)
}

// == Reclaim ==
/// Deletes candidates in expiry order until at least `required` units are
/// freed or candidates run out. `exclude` is never deleted.
pub fn reclaim(
    backend: &dyn StorageBackend,
    required: u64,
    exclude: Option<&str>,
) -> Result<EvictionReport> {
    let mut report = EvictionReport::default();
    if required == 0 {
        return Ok(report);
    }

    for candidate in candidates(backend)? {
        if report.freed >= required {
            break;
        }
        if exclude == Some(candidate.key.as_str()) {
            continue;
        }

        backend.delete(&candidate.key)?;
        debug!(
            key = %candidate.key,
            expires_at = candidate.expires_at,
            size = candidate.size,
            "evicted entry"
        );
        report.freed += candidate.size;
        report.removed.push(candidate.key);
    }

    info!(
        required,
        freed = report.freed,
        removed = report.removed.len(),
        "eviction pass finished"
    );
    Ok(report)
}
