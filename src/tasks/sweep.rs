//! TTL Sweep Task
//!
//! Background task that periodically fires due expiry timers and removes
//! expired entries from the backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::PersistentCache;

/// Spawns a background task that periodically sweeps expired entries.
///
/// Each run holds the engine lock for one full pass, so it never interleaves
/// with a public API call.
///
/// # Arguments
/// * `cache` - Shared engine
/// * `sweep_interval_secs` - Interval in seconds between runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(Mutex::new(PersistentCache::new(backend, config)));
/// let sweep_handle = spawn_sweep_task(cache.clone(), 30);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(
    cache: Arc<Mutex<PersistentCache>>,
    sweep_interval_secs: u64,
) -> JoinHandle<()> {
    spawn_sweep_task_every(cache, Duration::from_secs(sweep_interval_secs.max(1)))
}

/// Same as [`spawn_sweep_task`] with an arbitrary interval.
pub fn spawn_sweep_task_every(
    cache: Arc<Mutex<PersistentCache>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let (timers, swept) = {
                let mut guard = cache.lock().await;
                let timers = guard.run_due_timers();
                let swept = guard.sweep_expired();
                (timers, swept)
            };

            if timers + swept > 0 {
                info!(
                    "TTL sweep: expired {} bound keys, removed {} entries",
                    timers, swept
                );
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    })
}
