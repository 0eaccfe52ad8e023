//! Cache Module
//!
//! Provides the record table, TTL expiry with lock exemption, and the
//! get-or-compute store that keeps the table synchronized with its backing file.

mod record;
mod stats;
mod store;
mod table;


// Re-export public types
pub use record::{current_timestamp, CacheRecord};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use table::{validate_key, CacheTable};

// == Public Constants ==
/// Reserved envelope field holding the table checksum; never a valid cache key
pub const HASH_SUM_KEY: &str = "hash-sum";
