//! Reporting Types
//!
//! Serializable snapshots returned by inspection calls and delivered to
//! subscribers.

use serde::Serialize;

use crate::storage::ProcessId;

/// Size and quota figures for one key, as returned by `storage_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    /// Size of this key's entry in backend units, 0 when absent
    pub size: u64,
    /// Whether the backend holds the key
    pub exists: bool,
    /// Units used across the whole backend
    pub quota_used: u64,
    /// Backend capacity, `None` = unbounded
    pub quota_capacity: Option<u64>,
    /// Units still free, `None` = unbounded
    pub remaining: Option<u64>,
    /// Milliseconds until the entry expires, `None` when absent or untimed
    pub ttl_remaining_ms: Option<u64>,
}

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Updated,
    Removed,
    Expired,
    Evicted,
    Refreshed,
}

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    Local,
    External(ProcessId),
}

/// Notification delivered to subscribers of a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEvent {
    pub key: String,
    pub kind: ChangeKind,
    pub origin: ChangeOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_info_serialize() {
        let info = StorageInfo {
            size: 12,
            exists: true,
            quota_used: 40,
            quota_capacity: Some(100),
            remaining: Some(60),
            ttl_remaining_ms: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["size"], 12);
        assert_eq!(json["remaining"], 60);
        assert!(json["ttl_remaining_ms"].is_null());
    }

    #[test]
    fn test_event_serialize() {
        let event = CacheEvent {
            key: "app:theme".to_string(),
            kind: ChangeKind::Updated,
            origin: ChangeOrigin::External(ProcessId(3)),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"key":"app:theme","kind":"updated","origin":{"external":3}}"#
        );
    }
}
