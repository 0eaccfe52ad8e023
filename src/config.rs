//! Configuration Module
//!
//! Handles loading and managing cache store configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::persist::CacheFormat;

/// Logical cache name used when none is given.
pub const DEFAULT_NAME: &str = "nanoBlockCache";

/// Cache store configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding the backing file
    pub directory: PathBuf,
    /// Logical cache name, hashed into the backing file name
    pub name: String,
    /// On-disk flavor
    pub format: CacheFormat,
    /// Always recompute through the refresh callback
    pub debug: bool,
    /// Evict stale unlocked records on open and before every read
    pub delete_expired: bool,
    /// Wrap payloads in base64
    pub base64: bool,
    /// Prepend the access-denial preamble to `Php` files
    pub secure_access: bool,
    /// TTL in seconds used by the short resolve variants
    pub default_ttl: u64,
}

impl CacheConfig {
    /// Creates a default configuration for the given name and directory.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            ..Self::default()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Backing directory (default: `nanoBlockCache/`)
    /// - `CACHE_NAME` - Logical cache name (default: `nanoBlockCache`)
    /// - `CACHE_FORMAT` - `php`, `json` or `text` (default: `json`)
    /// - `CACHE_DEBUG` - Debug mode (default: false)
    /// - `CACHE_DELETE_EXPIRED` - Auto-evict on read (default: true)
    /// - `CACHE_BASE64` - Base64 payloads (default: true)
    /// - `CACHE_SECURE_ACCESS` - Access-denial preamble (default: true)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            directory: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            name: env::var("CACHE_NAME").unwrap_or(defaults.name),
            format: parse_var("CACHE_FORMAT").unwrap_or(defaults.format),
            debug: parse_flag("CACHE_DEBUG").unwrap_or(defaults.debug),
            delete_expired: parse_flag("CACHE_DELETE_EXPIRED").unwrap_or(defaults.delete_expired),
            base64: parse_flag("CACHE_BASE64").unwrap_or(defaults.base64),
            secure_access: parse_flag("CACHE_SECURE_ACCESS").unwrap_or(defaults.secure_access),
            default_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.default_ttl),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(format!("{DEFAULT_NAME}/")),
            name: DEFAULT_NAME.to_string(),
            format: CacheFormat::Json,
            debug: false,
            delete_expired: true,
            base64: true,
            secure_access: true,
            default_ttl: 60,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_flag(name: &str) -> Option<bool> {
    match env::var(name).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
