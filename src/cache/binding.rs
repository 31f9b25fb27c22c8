//! Binding Module
//!
//! A binding is a process-local handle tracking one key's current value for
//! one consumer. The engine owns the value; the handle is only a ticket.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::codec::{self, Validator};
use crate::cache::CacheKey;

/// Values that can be cached: serializable, clonable and thread-safe.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

static NEXT_BINDING: AtomicU64 = AtomicU64::new(1);

/// Process-unique binding identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BINDING.fetch_add(1, Ordering::Relaxed))
    }
}

// == Binding State ==
/// Lifecycle of a binding.
///
/// `Uninitialized → Hydrated → {Updated | ExternallyUpdated | Expired |
/// Removed} → Released`. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Uninitialized,
    Hydrated,
    Updated,
    ExternallyUpdated,
    Expired,
    Removed,
    Released,
}

// == Binding Handle ==
/// Typed handle returned by `get`. Not clonable: releasing it consumes it.
#[derive(Debug)]
pub struct Binding<T> {
    id: BindingId,
    key: CacheKey,
    fallback: T,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Binding<T> {
    pub(crate) fn new(id: BindingId, key: CacheKey, fallback: T) -> Self {
        Self {
            id,
            key,
            fallback,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The default this binding reverts to on miss, expiry or removal.
    pub fn fallback(&self) -> &T {
        &self.fallback
    }
}

// == Slot Codec ==
/// Type-erased decoder so payloads from other processes can be re-run
/// through each binding's own read path.
pub(crate) trait SlotCodec: Send + Sync {
    fn decode(&self, payload: &serde_json::Value) -> Option<Box<dyn Any + Send + Sync>>;
    fn fallback(&self) -> Box<dyn Any + Send + Sync>;
}

pub(crate) struct TypedCodec<T> {
    pub(crate) fallback: T,
    pub(crate) validator: Option<Validator<T>>,
}

impl<T: Cacheable> SlotCodec for TypedCodec<T> {
    fn decode(&self, payload: &serde_json::Value) -> Option<Box<dyn Any + Send + Sync>> {
        codec::decode::<T>(payload.clone(), self.validator.as_ref())
            .ok()
            .map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
    }

    fn fallback(&self) -> Box<dyn Any + Send + Sync> {
        Box::new(self.fallback.clone())
    }
}

// == Binding Slot ==
/// Engine-side state behind a [`Binding`].
pub(crate) struct BindingSlot {
    pub(crate) key: String,
    pub(crate) codec: Box<dyn SlotCodec>,
    /// Current value, always a `T`
    pub(crate) value: Box<dyn Any + Send + Sync>,
    /// Payload the value came from, `None` while showing the fallback
    pub(crate) payload: Option<serde_json::Value>,
    pub(crate) ttl: Option<Duration>,
    pub(crate) state: BindingState,
    /// Local value not persisted to the backend
    pub(crate) dirty: bool,
}

impl BindingSlot {
    pub(crate) fn new<T: Cacheable>(
        key: &CacheKey,
        fallback: T,
        validator: Option<Validator<T>>,
        ttl: Option<Duration>,
    ) -> Self {
        let codec = TypedCodec {
            fallback: fallback.clone(),
            validator,
        };
        Self {
            key: key.as_str().to_string(),
            codec: Box::new(codec),
            value: Box::new(fallback),
            payload: None,
            ttl,
            state: BindingState::Uninitialized,
            dirty: false,
        }
    }

    /// Takes `payload` if it decodes for this binding, else reverts to the
    /// fallback. Returns whether the payload was accepted.
    pub(crate) fn assign(&mut self, payload: Option<&serde_json::Value>, state: BindingState) -> bool {
        let decoded = payload.and_then(|p| self.codec.decode(p).map(|v| (p.clone(), v)));
        let accepted = decoded.is_some();
        match decoded {
            Some((payload, value)) => {
                self.value = value;
                self.payload = Some(payload);
            }
            None => {
                self.value = self.codec.fallback();
                self.payload = None;
            }
        }
        self.state = state;
        self.dirty = false;
        accepted
    }

    pub(crate) fn get<T: Cacheable>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}
