//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's guarantees over generated inputs.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::eviction;
use crate::cache::{ManualClock, PersistentCache};
use crate::config::Config;
use crate::error::CacheError;
use crate::models::{GetOptions, SetOptions};
use crate::storage::{MemoryBackend, SharedMemory, StorageBackend};

// == Test Configuration ==
const START: u64 = 1_700_000_000_000;

fn engine(shared: &SharedMemory, clock: &ManualClock) -> PersistentCache {
    PersistentCache::new(Arc::new(shared.connect()), Config::default())
        .with_clock(Arc::new(clock.clone()))
}

// == Strategies ==
/// Generates key names (non-empty, no namespace separator)
fn name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,24}"
}

/// Generates text values
fn text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}"
}

/// Generates payloads that can never parse as an envelope
fn garbage_strategy() -> impl Strategy<Value = String> {
    "[a-z{}\\[\\]: ]{0,40}".prop_map(|s| format!("#{}", s))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* value written without TTL, a fresh binding created afterwards
    // SHALL observe exactly that value.
    #[test]
    fn prop_set_then_get_roundtrip(
        entries in prop::collection::btree_map(name_strategy(), (any::<i64>(), text_strategy()), 1..20)
    ) {
        let shared = SharedMemory::new(None);
        let clock = ManualClock::new(START);
        let mut cache = engine(&shared, &clock);

        for (name, value) in &entries {
            cache.set(&cache.key(name), value, SetOptions::new()).unwrap();
        }
        for (name, value) in &entries {
            let binding = cache.get(&cache.key(name), (0i64, String::new()), GetOptions::default());
            prop_assert_eq!(&cache.value(&binding), value);
        }
    }

    // *For any* TTL, the value SHALL be visible strictly before the deadline
    // and SHALL read as the fallback from the deadline on.
    #[test]
    fn prop_ttl_expiry(ttl_ms in 1u64..600_000, elapsed_ms in 0u64..1_200_000) {
        let shared = SharedMemory::new(None);
        let clock = ManualClock::new(START);
        let mut cache = engine(&shared, &clock);
        let key = cache.key("session");

        cache
            .set(&key, &"live", SetOptions::new().ttl(Duration::from_millis(ttl_ms)))
            .unwrap();
        clock.advance(Duration::from_millis(elapsed_ms));

        let binding = cache.get(&key, String::from("fallback"), GetOptions::default());
        let expected = if elapsed_ms >= ttl_ms { "fallback" } else { "live" };
        prop_assert_eq!(cache.value(&binding), expected);
        prop_assert_eq!(cache.has_value(&key), elapsed_ms < ttl_ms);
    }

    // *For any* write rejected by the quota guard, the backend and every
    // binding SHALL keep their previous contents.
    #[test]
    fn prop_quota_rejection_is_atomic(
        capacity in 20u64..200,
        first in text_strategy(),
        second in text_strategy(),
    ) {
        let shared = SharedMemory::new(Some(capacity));
        let clock = ManualClock::new(START);
        let mut cache = engine(&shared, &clock);
        let key = cache.key("doc");

        let _ = cache.set(&key, &first, SetOptions::new().auto_reclaim(false));
        let binding = cache.get(&key, String::from("-"), GetOptions::default());
        let before_raw = cache.backup(&key);
        let before_value = cache.value(&binding);

        match cache.set(&key, &second, SetOptions::new().auto_reclaim(false)) {
            Ok(()) => prop_assert_eq!(cache.value(&binding), second),
            Err(e) => {
                prop_assert!(matches!(e, CacheError::QuotaExceeded { .. }), "unexpected error {:?}", e);
                prop_assert_eq!(cache.backup(&key), before_raw);
                prop_assert_eq!(cache.value(&binding), before_value);
            }
        }
    }

    // *For any* set of timed entries, a reclamation pass SHALL either free
    // at least the requested units or have removed every candidate, and
    // SHALL remove entries in non-decreasing expiry order.
    #[test]
    fn prop_eviction_order_and_sufficiency(
        deadlines in prop::collection::btree_map(name_strategy(), 1u64..1_000_000, 1..20),
        required in 1u64..2_000,
    ) {
        let backend = MemoryBackend::new(None);
        for (key, deadline) in &deadlines {
            backend
                .write(key, &format!(r#"{{"value":0,"__ttl":{}}}"#, deadline))
                .unwrap();
        }
        let candidates = eviction::candidates(&backend).unwrap();
        let total: u64 = candidates.iter().map(|c| c.size).sum();

        let report = eviction::reclaim(&backend, required, None).unwrap();

        if report.freed < required {
            prop_assert_eq!(report.freed, total);
            prop_assert_eq!(report.removed.len(), deadlines.len());
        }
        let removed_deadlines: Vec<u64> =
            report.removed.iter().map(|key| deadlines[key]).collect();
        prop_assert!(removed_deadlines.windows(2).all(|w| w[0] <= w[1]));
        for key in &report.removed {
            prop_assert!(backend.read(key).unwrap().is_none());
        }
    }

    // *For any* payload that is not an envelope, reading SHALL yield the
    // fallback and SHALL delete the stored payload.
    #[test]
    fn prop_corrupt_payload_self_heals(garbage in garbage_strategy(), fallback in any::<u32>()) {
        let shared = SharedMemory::new(None);
        let clock = ManualClock::new(START);
        let mut cache = engine(&shared, &clock);
        let key = cache.key("prefs");
        shared.connect().write(key.as_str(), &garbage).unwrap();

        let binding = cache.get(&key, fallback, GetOptions::default());

        prop_assert_eq!(cache.value(&binding), fallback);
        prop_assert!(!cache.has_value(&key));
        prop_assert_eq!(cache.stats().corruptions, 1);
    }

    // *For any* sequence of writes in one process, another process tracking
    // the key SHALL end on the last written value after draining its events.
    #[test]
    fn prop_cross_process_last_write_wins(values in prop::collection::vec(any::<i32>(), 1..20)) {
        let shared = SharedMemory::new(None);
        let clock = ManualClock::new(START);
        let mut writer = engine(&shared, &clock);
        let mut reader = engine(&shared, &clock);
        let key = writer.key("counter");
        let binding = reader.get(&key, -1i32, GetOptions::default());

        for value in &values {
            writer.set(&key, value, SetOptions::new()).unwrap();
        }

        prop_assert_eq!(reader.process_sync_events(), values.len());
        prop_assert_eq!(reader.value(&binding), *values.last().unwrap());
        prop_assert_eq!(reader.generation(&key), values.len() as u64);
        prop_assert!(!reader.is_dirty(&key));
    }

    // *For any* live entry, migration SHALL move the value under the new key
    // and remove the old one; a failed migration SHALL leave the old key.
    #[test]
    fn prop_migration_moves_or_keeps(
        value in text_strategy(),
        capacity in prop::option::of(30u64..300),
    ) {
        let shared = SharedMemory::new(None);
        let clock = ManualClock::new(START);
        let mut cache = engine(&shared, &clock);
        let old = cache.key("v1");
        let new = cache.key("v2");
        cache.set(&old, &value, SetOptions::new()).unwrap();
        shared.set_capacity(capacity);

        let doubled = format!("{}{}", value, value);
        match cache.migrate(&old, &new, Some(|s: String| format!("{}{}", s, s))) {
            Ok(()) => {
                prop_assert!(!cache.has_value(&old));
                let binding = cache.get(&new, String::new(), GetOptions::default());
                prop_assert_eq!(cache.value(&binding), doubled);
            }
            Err(_) => {
                prop_assert!(cache.has_value(&old));
                prop_assert!(!cache.has_value(&new));
            }
        }
    }

    // *For any* mix of namespaces, export SHALL contain exactly the live
    // entries of the configured namespace.
    #[test]
    fn prop_export_is_namespace_scoped(
        ours in prop::collection::btree_map(name_strategy(), any::<u16>(), 0..10),
        theirs in prop::collection::btree_map(name_strategy(), any::<u16>(), 0..10),
    ) {
        let shared = SharedMemory::new(None);
        let clock = ManualClock::new(START);
        let mut cache = engine(&shared, &clock);
        let foreign = shared.connect();

        for (name, value) in &ours {
            cache.set(&cache.key(name), value, SetOptions::new()).unwrap();
        }
        for (name, value) in &theirs {
            foreign
                .write(&format!("other:{}", name), &format!(r#"{{"value":{}}}"#, value))
                .unwrap();
        }

        let expected: BTreeMap<String, serde_json::Value> = ours
            .iter()
            .map(|(name, value)| (format!("app:{}", name), serde_json::json!(value)))
            .collect();
        prop_assert_eq!(cache.export_all(), expected);
    }
}
