//! TTL Envelope Module
//!
//! Wraps a serialized value with its optional expiry timestamp. This is the
//! single blob stored per key: `{"value": <payload>, "__ttl": <unix ms>}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Envelope ==
/// A stored value plus its expiry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// The serialized caller value
    pub value: serde_json::Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    #[serde(rename = "__ttl", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl Envelope {
    // == Constructor ==
    /// Wraps `value`, expiring `ttl` after `now_ms` when a TTL is given.
    pub fn wrap(value: serde_json::Value, ttl: Option<Duration>, now_ms: u64) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| now_ms.saturating_add(ttl.as_millis() as u64)),
        }
    }

    /// Wraps `value` with an absolute expiry.
    pub fn with_expiry(value: serde_json::Value, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    // == Parse ==
    /// Unwraps a raw backend payload.
    ///
    /// Anything that is not a well-formed envelope is `Corrupt`.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    // == Encode ==
    /// Produces the raw backend payload.
    pub fn to_blob(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CacheError::SerializeFailure(e.to_string()))
    }

    // == Is Expired ==
    /// Checks if the envelope has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiration time.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    /// Milliseconds left before expiry at `now_ms`; 0 once past the
    /// deadline, `None` for untimed entries.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now_ms))
    }
}
