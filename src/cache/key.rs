//! Cache keys, optionally namespaced by an application prefix.

use std::fmt;

use serde::Serialize;

/// Separator between namespace and name.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Opaque key of one backend entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Uses `raw` verbatim.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Builds `namespace:name`. An empty namespace yields `name` alone.
    pub fn namespaced(namespace: &str, name: &str) -> Self {
        if namespace.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the key lives under `namespace`.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        namespace.is_empty()
            || self
                .0
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with(NAMESPACE_SEPARATOR))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_key() {
        let key = CacheKey::namespaced("console", "theme");
        assert_eq!(key.as_str(), "console:theme");
        assert_eq!(key.to_string(), "console:theme");
        assert!(key.in_namespace("console"));
        assert!(!key.in_namespace("cons"));
        assert!(!key.in_namespace("other"));
    }

    #[test]
    fn test_empty_namespace() {
        let key = CacheKey::namespaced("", "theme");
        assert_eq!(key.as_str(), "theme");
        assert!(key.in_namespace(""));
    }

    #[test]
    fn test_conversions() {
        let a: CacheKey = "x".into();
        let b: CacheKey = String::from("x").into();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), r#""x""#);
    }
}
