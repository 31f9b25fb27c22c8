//! Cache Store Module
//!
//! Public cache engine: typed bindings over a shared storage backend with
//! TTL envelopes, quota-guarded writes, corruption self-healing and
//! reconciliation of changes made by other processes.
//!
//! Every call is synchronous and completes before returning. Storage
//! failures never escape reads; writes return a `Result` and are also
//! reported to the injected error callback.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::binding::{BindingId, BindingSlot, Cacheable};
use crate::cache::codec;
use crate::cache::quota;
use crate::cache::sync::SyncListener;
use crate::cache::timers::ExpiryTimers;
use crate::cache::{
    Binding, BindingState, CacheKey, CacheStats, Clock, Envelope, SystemClock,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{CacheEvent, ChangeKind, ChangeOrigin, GetOptions, SetOptions, StorageInfo};
use crate::storage::{entry_size, StorageBackend};

/// Receives write failures that were also returned to the caller.
pub type ErrorCallback = Box<dyn Fn(&CacheKey, &CacheError) + Send + Sync>;

/// Observer of changes to one key.
pub type Listener = Box<dyn Fn(&CacheEvent) + Send + Sync>;

/// Handle returned by [`PersistentCache::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// == Persistent Cache ==
/// The cache engine for one process.
pub struct PersistentCache {
    pub(super) backend: Arc<dyn StorageBackend>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: Config,
    pub(super) slots: HashMap<BindingId, BindingSlot>,
    /// Tracked keys and the bindings on them, in creation order
    pub(super) tracked: HashMap<String, Vec<BindingId>>,
    pub(super) generations: HashMap<String, u64>,
    pub(super) timers: ExpiryTimers,
    pub(super) listeners: HashMap<SubscriptionId, (String, Listener)>,
    pub(super) next_subscription: u64,
    pub(super) on_error: Option<ErrorCallback>,
    pub(super) sync: Option<SyncListener>,
    pub(super) stats: CacheStats,
}

impl PersistentCache {
    // == Constructor ==
    /// Creates an engine over `backend` and attaches to its change
    /// notifications when the backend has them.
    pub fn new(backend: Arc<dyn StorageBackend>, config: Config) -> Self {
        let sync = SyncListener::attach(backend.as_ref());
        if sync.is_none() {
            debug!("backend has no change notifications; cross-process sync disabled");
        }
        Self {
            backend,
            clock: Arc::new(SystemClock),
            config,
            slots: HashMap::new(),
            tracked: HashMap::new(),
            generations: HashMap::new(),
            timers: ExpiryTimers::new(),
            listeners: HashMap::new(),
            next_subscription: 0,
            on_error: None,
            sync,
            stats: CacheStats::new(),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Installs the write-failure callback.
    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CacheKey, &CacheError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Builds a key in the configured namespace.
    pub fn key(&self, name: &str) -> CacheKey {
        CacheKey::namespaced(&self.config.namespace, name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Get ==
    /// Returns a binding on `key`, hydrated from the backend or from
    /// `fallback` on miss, expiry, corruption or an unavailable backend.
    pub fn get<T: Cacheable>(
        &mut self,
        key: &CacheKey,
        fallback: T,
        options: GetOptions<T>,
    ) -> Binding<T> {
        let id = BindingId::next();
        let mut slot = BindingSlot::new(key, fallback.clone(), options.validate, options.ttl);

        let envelope = self.load_envelope(key.as_str());
        let expires_at = envelope.as_ref().and_then(|env| env.expires_at);
        let accepted = slot.assign(
            envelope.as_ref().map(|env| &env.value),
            BindingState::Hydrated,
        );

        self.slots.insert(id, slot);
        self.tracked
            .entry(key.as_str().to_string())
            .or_default()
            .push(id);
        self.stats.set_live_bindings(self.slots.len());

        match (envelope.is_some(), accepted) {
            (true, true) => {
                self.stats.record_hit();
                self.track_expiry(key.as_str(), expires_at);
            }
            (true, false) => {
                self.stats.record_miss();
                self.purge_corrupt(key.as_str(), "value rejected by decoder or validator");
                if let Some(slot) = self.slots.get_mut(&id) {
                    slot.state = BindingState::Hydrated;
                }
            }
            _ => self.stats.record_miss(),
        }

        Binding::new(id, key.clone(), fallback)
    }

    /// Current value of `binding`.
    pub fn value<T: Cacheable>(&self, binding: &Binding<T>) -> T {
        self.slots
            .get(&binding.id())
            .and_then(|slot| slot.get::<T>())
            .unwrap_or_else(|| binding.fallback().clone())
    }

    /// Lifecycle state of `binding`.
    pub fn state<T>(&self, binding: &Binding<T>) -> BindingState {
        self.slots
            .get(&binding.id())
            .map(|slot| slot.state)
            .unwrap_or(BindingState::Released)
    }

    /// Whether `binding` holds a value that was never persisted.
    pub fn is_binding_dirty<T>(&self, binding: &Binding<T>) -> bool {
        self.slots
            .get(&binding.id())
            .is_some_and(|slot| slot.dirty)
    }

    // == Release ==
    /// Discards `binding`. Cancels the key's expiry timer when this was the
    /// last binding on it.
    pub fn release<T>(&mut self, binding: Binding<T>) {
        let id = binding.id();
        if self.slots.remove(&id).is_none() {
            return;
        }
        let key = binding.key().as_str();
        if let Some(ids) = self.tracked.get_mut(key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.tracked.remove(key);
                self.timers.cancel(key);
            }
        }
        self.stats.set_live_bindings(self.slots.len());
    }

    // == Set ==
    /// Writes `value` under `key` and updates every local binding on it.
    ///
    /// Without an explicit TTL the write takes the TTL of the bindings on
    /// `key` (`GetOptions::ttl`), then the configured default.
    ///
    /// On failure the backend and the bindings keep their previous state.
    /// An unavailable backend degrades to an in-memory update.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: &CacheKey,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        let result = self.encode_and_write(key.as_str(), value, options);
        self.report(key, result)
    }

    // == Update ==
    /// Applies `f` to the binding's last-known local value and writes the
    /// result. The input is not re-read from the backend; call `refresh`
    /// first when the freshest cross-process value matters.
    pub fn update<T, F>(&mut self, binding: &Binding<T>, f: F, options: SetOptions) -> Result<()>
    where
        T: Cacheable,
        F: FnOnce(T) -> T,
    {
        let next = f(self.value(binding));
        let ttl = options
            .ttl
            .or_else(|| self.slots.get(&binding.id()).and_then(|slot| slot.ttl));
        self.set(binding.key(), &next, SetOptions { ttl, ..options })
    }

    // == Remove ==
    /// Deletes `key` locally and from the backend. Idempotent.
    pub fn remove(&mut self, key: &CacheKey) {
        if let Err(e) = self.backend.delete(key.as_str()) {
            warn!(key = %key, error = %e, "backend delete failed; removing locally only");
        }
        self.timers.cancel(key.as_str());
        self.assign_all(key.as_str(), None, BindingState::Removed, true);
        self.notify(key.as_str(), ChangeKind::Removed, ChangeOrigin::Local);
    }

    // == Has Value ==
    /// Backend existence check, independent of local bindings.
    pub fn has_value(&self, key: &CacheKey) -> bool {
        match self.backend.read(key.as_str()) {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                debug!(key = %key, error = %e, "existence check failed");
                false
            }
        }
    }

    // == Is Dirty ==
    /// True when any binding on `key` diverges from a fresh backend read or
    /// holds an unpersisted value.
    pub fn is_dirty(&self, key: &CacheKey) -> bool {
        let Some(ids) = self.tracked.get(key.as_str()) else {
            return false;
        };
        let slots: Vec<&BindingSlot> = ids.iter().filter_map(|id| self.slots.get(id)).collect();
        if slots.iter().any(|slot| slot.dirty) {
            return true;
        }

        let fresh = match self.backend.read(key.as_str()) {
            Ok(raw) => raw
                .and_then(|raw| Envelope::parse(&raw).ok())
                .filter(|env| !env.is_expired(self.clock.now_ms()))
                .map(|env| env.value),
            Err(_) => return false,
        };

        slots.iter().any(|slot| {
            let visible = fresh
                .as_ref()
                .filter(|payload| slot.codec.decode(payload).is_some());
            slot.payload.as_ref() != visible
        })
    }

    // == Refresh ==
    /// Re-hydrates every binding on `key` from the backend and bumps the
    /// key's generation.
    pub fn refresh(&mut self, key: &CacheKey) {
        if !self.tracked.contains_key(key.as_str()) {
            return;
        }
        let envelope = self.load_envelope(key.as_str());
        let expires_at = envelope.as_ref().and_then(|env| env.expires_at);
        let payload = envelope.map(|env| env.value);

        let all_accepted = self.assign_all(
            key.as_str(),
            payload.as_ref(),
            BindingState::Hydrated,
            true,
        );
        if payload.is_some() && !all_accepted {
            self.purge_corrupt(key.as_str(), "refresh rejected stored value");
        } else {
            self.track_expiry(key.as_str(), expires_at);
        }

        self.bump_generation(key.as_str());
        self.notify(key.as_str(), ChangeKind::Refreshed, ChangeOrigin::Local);
    }

    /// Number of external changes and refreshes applied to `key`.
    pub fn generation(&self, key: &CacheKey) -> u64 {
        self.generations.get(key.as_str()).copied().unwrap_or(0)
    }

    // == Backup / Restore ==
    /// Raw stored payload of `key`, bypassing TTL and validation.
    pub fn backup(&self, key: &CacheKey) -> Option<String> {
        self.backend.read(key.as_str()).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "backup read failed");
            None
        })
    }

    /// Writes a raw payload under `key`, bypassing TTL and validation but
    /// not the quota guard. Local bindings are re-hydrated afterwards.
    pub fn restore(&mut self, key: &CacheKey, blob: &str) -> Result<()> {
        let written = self.write_blob(key.as_str(), blob, self.config.auto_reclaim);
        let result = self.report(key, written);
        if result.is_ok() {
            info!(key = %key, "entry restored from backup");
            self.assign_restored(key.as_str(), blob);
        }
        result
    }

    /// Points local bindings at a restored blob. Unlike `refresh`, nothing
    /// is purged: an expired or unreadable blob stays in the backend and
    /// the bindings show their fallback.
    fn assign_restored(&mut self, key: &str, blob: &str) {
        if self.tracked.contains_key(key) {
            match Envelope::parse(blob) {
                Ok(envelope) if !envelope.is_expired(self.clock.now_ms()) => {
                    let payload = Some(&envelope.value);
                    if !self.assign_all(key, payload, BindingState::Hydrated, true) {
                        debug!(key, "restored value rejected by a local binding");
                    }
                    self.track_expiry(key, envelope.expires_at);
                }
                Ok(_) => {
                    self.timers.cancel(key);
                    self.assign_all(key, None, BindingState::Expired, true);
                }
                Err(e) => {
                    debug!(key, error = %e, "restored blob is not an envelope");
                    self.timers.cancel(key);
                    self.assign_all(key, None, BindingState::Removed, true);
                }
            }
            self.bump_generation(key);
        }
        self.notify(key, ChangeKind::Updated, ChangeOrigin::Local);
    }

    // == Migrate ==
    /// Moves the value of `old_key` to `new_key`, optionally transformed.
    ///
    /// The remaining TTL is carried over. `old_key` is deleted only after
    /// the write under `new_key` succeeded, and never when both keys are the
    /// same (the value is then rewritten in place).
    pub fn migrate<T, F>(
        &mut self,
        old_key: &CacheKey,
        new_key: &CacheKey,
        transform: Option<F>,
    ) -> Result<()>
    where
        T: Cacheable,
        F: FnOnce(T) -> T,
    {
        let result = self.migrate_inner(old_key, new_key, transform);
        let result = self.report(new_key, result);
        if result.is_ok() {
            if old_key != new_key {
                self.remove(old_key);
            }
            info!(from = %old_key, to = %new_key, "entry migrated");
        }
        result
    }

    fn migrate_inner<T, F>(
        &mut self,
        old_key: &CacheKey,
        new_key: &CacheKey,
        transform: Option<F>,
    ) -> Result<()>
    where
        T: Cacheable,
        F: FnOnce(T) -> T,
    {
        let raw = self
            .backend
            .read(old_key.as_str())?
            .ok_or_else(|| CacheError::NotFound(old_key.to_string()))?;
        let envelope = Envelope::parse(&raw)?;
        if envelope.is_expired(self.clock.now_ms()) {
            return Err(CacheError::NotFound(old_key.to_string()));
        }

        let value: T = codec::decode(envelope.value, None)?;
        let value = match transform {
            Some(f) => f(value),
            None => value,
        };
        let migrated = Envelope::with_expiry(codec::encode(&value)?, envelope.expires_at);
        let blob = migrated.to_blob()?;

        // No in-memory degrade here: an unavailable backend fails the move.
        self.write_blob(new_key.as_str(), &blob, self.config.auto_reclaim)?;
        self.apply_local_write(new_key.as_str(), &migrated, true);
        Ok(())
    }

    // == Export ==
    /// Every live, well-formed entry in the configured namespace.
    pub fn export_all(&self) -> BTreeMap<String, serde_json::Value> {
        let entries = match self.backend.enumerate() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "export failed");
                return BTreeMap::new();
            }
        };
        let now = self.clock.now_ms();
        entries
            .into_iter()
            .filter(|(key, _)| CacheKey::new(key.as_str()).in_namespace(&self.config.namespace))
            .filter_map(|(key, raw)| {
                let envelope = Envelope::parse(&raw).ok()?;
                (!envelope.is_expired(now)).then_some((key, envelope.value))
            })
            .collect()
    }

    // == Storage Info ==
    /// Size of `key`'s entry and overall quota figures.
    pub fn storage_info(&self, key: &CacheKey) -> StorageInfo {
        let raw = self.backend.read(key.as_str()).ok().flatten();
        let usage = self.backend.estimate_usage().ok();
        StorageInfo {
            size: raw
                .as_deref()
                .map(|raw| entry_size(key.as_str(), raw))
                .unwrap_or(0),
            exists: raw.is_some(),
            quota_used: usage.map(|u| u.used).unwrap_or(0),
            quota_capacity: usage.and_then(|u| u.capacity),
            remaining: usage.and_then(|u| u.remaining()),
            ttl_remaining_ms: raw
                .as_deref()
                .and_then(|raw| Envelope::parse(raw).ok())
                .and_then(|env| env.ttl_remaining_ms(self.clock.now_ms())),
        }
    }

    // == Subscribe ==
    /// Registers `listener` for changes to `key`.
    pub fn subscribe<F>(&mut self, key: &CacheKey, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners
            .insert(id, (key.as_str().to_string(), Box::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    // == Expiry ==
    /// Fires every proactive expiry timer that is due. Returns the number of
    /// keys whose bindings were expired.
    pub fn run_due_timers(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut expired = 0;

        for key in self.timers.take_due(now) {
            if !self.tracked.contains_key(&key) {
                continue;
            }
            let current = match self.backend.read(&key) {
                Ok(raw) => raw.and_then(|raw| Envelope::parse(&raw).ok()),
                Err(e) => {
                    debug!(key, error = %e, "timer read failed; expiring locally");
                    None
                }
            };

            match current {
                // Overwritten with a later deadline since the timer was set.
                Some(env) if !env.is_expired(now) => {
                    if let Some(deadline) = env.expires_at {
                        self.timers.schedule(&key, deadline);
                    }
                }
                Some(_) => {
                    if let Err(e) = self.backend.delete(&key) {
                        warn!(key, error = %e, "failed to delete expired entry");
                    }
                    self.stats.record_expiration();
                    self.expire_local(&key);
                    expired += 1;
                }
                None => {
                    self.expire_local(&key);
                    expired += 1;
                }
            }
        }
        expired
    }

    /// Deletes every expired envelope in the backend. Returns the count.
    pub fn sweep_expired(&mut self) -> usize {
        let entries = match self.backend.enumerate() {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "sweep skipped");
                return 0;
            }
        };
        let now = self.clock.now_ms();
        let mut removed = 0;

        for (key, raw) in entries {
            let Ok(envelope) = Envelope::parse(&raw) else {
                continue;
            };
            if !envelope.is_expired(now) {
                continue;
            }
            if let Err(e) = self.backend.delete(&key) {
                warn!(key, error = %e, "failed to delete expired entry");
                continue;
            }
            self.stats.record_expiration();
            self.timers.cancel(&key);
            self.expire_local(&key);
            removed += 1;
        }

        if removed > 0 {
            info!("TTL sweep: removed {} expired entries", removed);
        }
        removed
    }

    /// Earliest pending proactive expiry, in Unix ms.
    pub fn next_timer_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    // == Stats ==
    /// Returns current engine statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_live_bindings(self.slots.len());
        stats
    }

    // == Internal: read path ==
    /// Reads and unwraps `key`. Expired and malformed entries are deleted and
    /// read as a miss; an unavailable backend reads as a miss.
    pub(super) fn load_envelope(&mut self, key: &str) -> Option<Envelope> {
        let raw = match self.backend.read(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "backend read failed; using fallback");
                return None;
            }
        };

        let envelope = match Envelope::parse(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.purge_corrupt(key, &e.to_string());
                return None;
            }
        };

        if envelope.is_expired(self.clock.now_ms()) {
            debug!(key, "entry expired at read");
            if let Err(e) = self.backend.delete(key) {
                warn!(key, error = %e, "failed to delete expired entry");
            }
            self.stats.record_expiration();
            self.timers.cancel(key);
            self.expire_local(key);
            return None;
        }
        Some(envelope)
    }

    /// Deletes a corrupt entry and reverts local bindings to their fallback.
    pub(super) fn purge_corrupt(&mut self, key: &str, reason: &str) {
        warn!(key, reason, "corrupt entry purged");
        if let Err(e) = self.backend.delete(key) {
            warn!(key, error = %e, "failed to delete corrupt entry");
        }
        self.stats.record_corruption();
        self.timers.cancel(key);
        self.assign_all(key, None, BindingState::Removed, true);
    }

    // == Internal: write path ==
    fn encode_and_write<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        // Serialization fails before the backend is touched.
        let payload = codec::encode(value)?;
        let ttl = options
            .ttl
            .or_else(|| self.binding_ttl(key))
            .or_else(|| self.config.default_ttl());
        let envelope = Envelope::wrap(payload, ttl, self.clock.now_ms());
        self.write_envelope(key, &envelope, options.auto_reclaim)
    }

    fn write_envelope(
        &mut self,
        key: &str,
        envelope: &Envelope,
        auto_reclaim: Option<bool>,
    ) -> Result<()> {
        let blob = envelope.to_blob()?;
        let auto_reclaim = auto_reclaim.unwrap_or(self.config.auto_reclaim);

        match self.write_blob(key, &blob, auto_reclaim) {
            Ok(()) => {
                self.apply_local_write(key, envelope, true);
                Ok(())
            }
            Err(CacheError::Unavailable(reason)) => {
                warn!(key, reason, "backend unavailable; keeping value in memory only");
                self.stats.record_degraded_write();
                self.apply_local_write(key, envelope, false);
                Ok(())
            }
            Err(e) => {
                if matches!(e, CacheError::QuotaExceeded { .. }) {
                    self.stats.record_quota_rejection();
                }
                Err(e)
            }
        }
    }

    /// Quota-guarded backend write. Evictions are applied to local bindings
    /// even when the write itself fails afterwards.
    fn write_blob(&mut self, key: &str, blob: &str, auto_reclaim: bool) -> Result<()> {
        let mut evicted = Vec::new();
        let written = quota::guarded_write(
            self.backend.as_ref(),
            key,
            blob,
            auto_reclaim,
            |report| evicted = report.removed.clone(),
        );
        if !evicted.is_empty() {
            self.after_eviction(&evicted);
        }
        written
    }

    fn apply_local_write(&mut self, key: &str, envelope: &Envelope, persisted: bool) {
        if !self.tracked.contains_key(key) {
            self.notify(key, ChangeKind::Updated, ChangeOrigin::Local);
            return;
        }
        self.assign_all(key, Some(&envelope.value), BindingState::Updated, persisted);
        self.track_expiry(key, envelope.expires_at);
        self.notify(key, ChangeKind::Updated, ChangeOrigin::Local);
    }

    fn after_eviction(&mut self, removed: &[String]) {
        self.stats.record_evictions(removed.len());
        for key in removed {
            self.timers.cancel(key);
            self.assign_all(key, None, BindingState::Removed, true);
            self.notify(key, ChangeKind::Evicted, ChangeOrigin::Local);
        }
    }

    // == Internal: binding bookkeeping ==
    /// Assigns `payload` to every binding on `key`. Returns false when no
    /// binding is tracked or any binding rejected the payload.
    pub(super) fn assign_all(
        &mut self,
        key: &str,
        payload: Option<&serde_json::Value>,
        state: BindingState,
        persisted: bool,
    ) -> bool {
        let Some(ids) = self.tracked.get(key) else {
            return false;
        };
        let mut all_accepted = true;
        for id in ids {
            if let Some(slot) = self.slots.get_mut(id) {
                let accepted = slot.assign(payload, state);
                slot.dirty = !persisted;
                all_accepted &= accepted || payload.is_none();
            }
        }
        all_accepted
    }

    /// TTL of the oldest binding on `key` that was created with one.
    fn binding_ttl(&self, key: &str) -> Option<Duration> {
        self.tracked
            .get(key)?
            .iter()
            .find_map(|id| self.slots.get(id).and_then(|slot| slot.ttl))
    }

    pub(super) fn expire_local(&mut self, key: &str) {
        self.assign_all(key, None, BindingState::Expired, true);
        self.notify(key, ChangeKind::Expired, ChangeOrigin::Local);
    }

    /// A key is tracked while it has a live binding or a subscriber.
    pub(super) fn is_tracked(&self, key: &str) -> bool {
        self.tracked.contains_key(key)
            || self.listeners.values().any(|(watched, _)| watched == key)
    }

    /// Schedules or cancels the proactive timer for a tracked key.
    pub(super) fn track_expiry(&mut self, key: &str, expires_at: Option<u64>) {
        match expires_at {
            Some(deadline) if self.tracked.contains_key(key) => {
                self.timers.schedule(key, deadline)
            }
            _ => {
                self.timers.cancel(key);
            }
        }
    }

    pub(super) fn bump_generation(&mut self, key: &str) {
        *self.generations.entry(key.to_string()).or_insert(0) += 1;
    }

    pub(super) fn notify(&self, key: &str, kind: ChangeKind, origin: ChangeOrigin) {
        let event = CacheEvent {
            key: key.to_string(),
            kind,
            origin,
        };
        for (watched, listener) in self.listeners.values() {
            if watched == key {
                listener(&event);
            }
        }
    }

    fn report<T>(&self, key: &CacheKey, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(key = %key, kind = e.kind(), error = %e, "cache write failed");
            if let Some(callback) = &self.on_error {
                callback(key, e);
            }
        }
        result
    }
}
