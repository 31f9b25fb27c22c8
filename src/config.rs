//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default capacity in UTF-16 code units (5 MiB, the usual browser storage quota).
pub const DEFAULT_CAPACITY: u64 = 5 * 1024 * 1024;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prefix applied to every key created through the cache
    pub namespace: String,
    /// Default TTL in seconds for writes without explicit TTL, 0 = no expiry
    pub default_ttl: u64,
    /// Whether quota pressure may evict TTL-bearing entries
    pub auto_reclaim: bool,
    /// Backend capacity in UTF-16 code units
    pub capacity: u64,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Directory holding the file backend
    pub storage_dir: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Key namespace prefix (default: app)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds, 0 disables (default: 0)
    /// - `CACHE_AUTO_RECLAIM` - Evict on quota pressure (default: true)
    /// - `CACHE_CAPACITY` - Backend capacity in UTF-16 units (default: 5242880)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `CACHE_STORAGE_DIR` - File backend directory (default: .storage_cache)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.namespace),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            auto_reclaim: env::var("CACHE_AUTO_RECLAIM")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.auto_reclaim),
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
            storage_dir: env::var("CACHE_STORAGE_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
        }
    }

    /// Default TTL as a duration, `None` when disabled.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "app".to_string(),
            default_ttl: 0,
            auto_reclaim: true,
            capacity: DEFAULT_CAPACITY,
            sweep_interval: 30,
            storage_dir: PathBuf::from(".storage_cache"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
