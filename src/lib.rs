//! Nano Cache - A single-file, key-addressed cache store
//!
//! Keeps an in-memory table of time-stamped, expirable records synchronized
//! with one checksummed backing file, and answers "compute or fetch if stale"
//! lookups through [`CacheStore::resolve`].

pub mod cache;
pub mod config;
pub mod error;
pub mod persist;

pub use cache::{CacheRecord, CacheStats, CacheStore, CacheTable};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use persist::CacheFormat;
