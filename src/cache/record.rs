//! Cache Record Module
//!
//! Defines the structure for individual cache records with TTL and lock support.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// == Cache Record ==
/// A single key's stored payload plus its expiry metadata.
///
/// Field names match the on-disk layout: `time`, `expire`, `data`, `lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Instant the record was last written (Unix seconds)
    #[serde(rename = "time")]
    pub timestamp: i64,
    /// Seconds after `timestamp` at which the record is stale
    #[serde(rename = "expire")]
    pub ttl: u64,
    /// Encoded payload
    #[serde(rename = "data")]
    pub payload: String,
    /// Locked records are never evicted by an expiry pass
    #[serde(rename = "lock", default)]
    pub locked: bool,
}

impl CacheRecord {
    // == Constructor ==
    /// Creates a new record stamped with the current time.
    ///
    /// # Arguments
    /// * `payload` - The already encoded payload
    /// * `ttl` - TTL in seconds
    /// * `locked` - Exempt the record from expiry-driven eviction
    pub fn new(payload: String, ttl: u64, locked: bool) -> Self {
        Self {
            timestamp: current_timestamp(),
            ttl,
            payload,
            locked,
        }
    }

    // == Is Expired ==
    /// Checks if the record is stale at the given instant.
    ///
    /// Boundary condition: a record is stale once `now - timestamp >= ttl`,
    /// so a TTL of zero is stale on the very next check.
    pub fn is_expired_at(&self, now: i64) -> bool {
        let ttl = i64::try_from(self.ttl).unwrap_or(i64::MAX);
        now.saturating_sub(self.timestamp) >= ttl
    }

    /// Checks if the record is stale right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp())
    }

    // == Time To Live ==
    /// Returns the remaining seconds before the record goes stale, zero once stale.
    pub fn ttl_remaining(&self) -> u64 {
        let elapsed = current_timestamp().saturating_sub(self.timestamp).max(0);
        self.ttl.saturating_sub(elapsed.unsigned_abs())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
