//! Cache Module
//!
//! Persistent cache engine: TTL envelopes, quota guarding, expiry-ordered
//! eviction, corruption self-healing and cross-process reconciliation.

mod binding;
mod clock;
mod codec;
mod envelope;
pub mod eviction;
mod key;
pub mod quota;
mod stats;
mod store;
mod sync;
mod timers;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use binding::{Binding, BindingId, BindingState, Cacheable};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{decode, encode, Validator};
pub use envelope::Envelope;
pub use eviction::{EvictionCandidate, EvictionReport};
pub use key::{CacheKey, NAMESPACE_SEPARATOR};
pub use stats::CacheStats;
pub use store::{ErrorCallback, Listener, PersistentCache, SubscriptionId};
pub use sync::SyncListener;
pub use timers::ExpiryTimers;
