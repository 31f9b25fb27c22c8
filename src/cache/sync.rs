//! Cross-Process Sync Module
//!
//! Applies backend change notifications from other processes to the local
//! bindings. Events are handled one by one in delivery order; nothing is
//! coalesced or reordered.

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::cache::{BindingState, Envelope, PersistentCache};
use crate::models::{ChangeKind, ChangeOrigin};
use crate::storage::{ProcessId, StorageBackend, StorageEvent};

// == Sync Listener ==
/// This process's subscription to the backend's change channel.
#[derive(Debug)]
pub struct SyncListener {
    rx: UnboundedReceiver<StorageEvent>,
    process_id: ProcessId,
}

impl SyncListener {
    /// Subscribes to `backend`, or `None` if it has no notifications.
    pub fn attach(backend: &dyn StorageBackend) -> Option<Self> {
        backend.subscribe().map(|rx| Self {
            rx,
            process_id: backend.process_id(),
        })
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Next pending event from another process, without waiting.
    pub fn try_next(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.origin == self.process_id => continue,
                Ok(event) => return Some(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Waits for the next event from another process. `None` once the
    /// backend side is gone.
    pub async fn next(&mut self) -> Option<StorageEvent> {
        while let Some(event) = self.rx.recv().await {
            if event.origin != self.process_id {
                return Some(event);
            }
        }
        None
    }
}

impl PersistentCache {
    // == Process Sync Events ==
    /// Drains and applies every pending notification. Returns how many were
    /// applied to tracked keys.
    pub fn process_sync_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.sync.as_mut().and_then(|sync| sync.try_next()) {
            if self.apply_storage_event(&event) {
                applied += 1;
            }
        }
        applied
    }

    /// Hands the subscription to an external driver such as
    /// [`spawn_sync_task`](crate::tasks::spawn_sync_task).
    pub fn take_sync_listener(&mut self) -> Option<SyncListener> {
        self.sync.take()
    }

    // == Apply Storage Event ==
    /// Reconciles local bindings with one change made by another process.
    ///
    /// Returns false when the event was ignored (own write or untracked key).
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if event.origin == self.backend.process_id() {
            return false;
        }
        let key = event.key.as_str();
        if !self.is_tracked(key) {
            return false;
        }

        let origin = ChangeOrigin::External(event.origin);
        let kind = match event.new_value.as_deref() {
            None => {
                self.timers.cancel(key);
                self.assign_all(key, None, BindingState::Removed, true);
                ChangeKind::Removed
            }
            Some(raw) => match Envelope::parse(raw) {
                // The writer owns its payload; only local bindings reset.
                Err(e) => {
                    warn!(key, origin = %event.origin, error = %e, "ignoring corrupt external value");
                    self.timers.cancel(key);
                    self.assign_all(key, None, BindingState::Removed, true);
                    ChangeKind::Removed
                }
                Ok(envelope) if envelope.is_expired(self.clock.now_ms()) => {
                    self.timers.cancel(key);
                    self.assign_all(key, None, BindingState::Expired, true);
                    ChangeKind::Expired
                }
                Ok(envelope) => {
                    let accepted = self.assign_all(
                        key,
                        Some(&envelope.value),
                        BindingState::ExternallyUpdated,
                        true,
                    );
                    if !accepted {
                        warn!(key, origin = %event.origin, "external value rejected by a local binding");
                    }
                    self.track_expiry(key, envelope.expires_at);
                    ChangeKind::Updated
                }
            },
        };

        self.bump_generation(key);
        self.stats.record_external_update();
        debug!(key, origin = %event.origin, ?kind, "applied external change");
        self.notify(key, kind, origin);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, SharedMemory};

    #[test]
    fn test_listener_skips_own_events() {
        let backend = MemoryBackend::new(None);
        let mut listener = SyncListener::attach(&backend).unwrap();

        // Events are never delivered to the writer, so nothing is pending.
        backend.write("k", "v").unwrap();
        assert!(listener.try_next().is_none());
        assert_eq!(listener.process_id(), backend.process_id());
    }

    #[test]
    fn test_listener_preserves_delivery_order() {
        let shared = SharedMemory::new(None);
        let a = shared.connect();
        let b = shared.connect();
        let mut listener = SyncListener::attach(&b).unwrap();

        for i in 0..5 {
            a.write("k", &i.to_string()).unwrap();
        }

        let seen: Vec<String> = std::iter::from_fn(|| listener.try_next())
            .filter_map(|event| event.new_value)
            .collect();
        assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_listener_next_waits_for_event() {
        let shared = SharedMemory::new(None);
        let a = shared.connect();
        let b = shared.connect();
        let mut listener = SyncListener::attach(&b).unwrap();

        a.write("k", "v").unwrap();
        let event = listener.next().await.unwrap();
        assert_eq!(event.key, "k");
        assert_eq!(event.origin, a.process_id());
    }
}
