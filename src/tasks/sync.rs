//! Sync Task
//!
//! Background task that applies change notifications from other processes
//! as soon as the backend delivers them.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{PersistentCache, SyncListener};

/// Spawns a task that feeds every event from `listener` into `cache`, in
/// delivery order. Ends when the backend drops its side of the channel.
///
/// Obtain the listener with [`PersistentCache::take_sync_listener`]; once
/// taken, `process_sync_events` on the engine becomes a no-op.
pub fn spawn_sync_task(
    cache: Arc<Mutex<PersistentCache>>,
    mut listener: SyncListener,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(process = %listener.process_id(), "Starting cross-process sync task");

        while let Some(event) = listener.next().await {
            let applied = cache.lock().await.apply_storage_event(&event);
            if !applied {
                debug!(key = %event.key, "ignored notification for untracked key");
            }
        }

        info!("Sync channel closed, stopping sync task");
    })
}
