//! Record Table Module
//!
//! In-memory mapping of cache keys to records. Ordered so that the serialized
//! form, and therefore its checksum, is canonical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheRecord, HASH_SUM_KEY};
use crate::error::{CacheError, Result};

// == Cache Table ==
/// The full set of records held for one backing file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheTable {
    records: BTreeMap<String, CacheRecord>,
}

impl CacheTable {
    // == Constructor ==
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // == Has Entry ==
    /// Returns true if a record exists under `key`, stale or not.
    pub fn has_entry(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    // == Is Expired ==
    /// Checks whether `key` is stale at `now`.
    ///
    /// An absent key is always reported as expired so that unknown keys
    /// trigger a refresh.
    pub fn is_expired_at(&self, key: &str, now: i64) -> bool {
        self.records
            .get(key)
            .map_or(true, |record| record.is_expired_at(now))
    }

    // == Get ==
    /// Returns the record stored under `key`.
    pub fn get(&self, key: &str) -> Option<&CacheRecord> {
        self.records.get(key)
    }

    // == Insert ==
    /// Stores a record, replacing any previous one under the same key.
    ///
    /// Rejects the reserved checksum key and the empty key.
    pub fn insert(&mut self, key: &str, record: CacheRecord) -> Result<()> {
        validate_key(key)?;
        self.records.insert(key.to_string(), record);
        Ok(())
    }

    // == Remove ==
    /// Removes the record under `key` regardless of its lock flag.
    pub fn remove(&mut self, key: &str) -> Option<CacheRecord> {
        self.records.remove(key)
    }

    // == Evict Expired ==
    /// Removes every record that is stale at `now` and not locked.
    ///
    /// Returns the evicted keys.
    pub fn evict_expired_at(&mut self, now: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| !record.locked && record.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.records.remove(key);
        }
        expired
    }

    // == Clear ==
    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Iterates over the keys in canonical order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Returns the current number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Checks that `key` can be stored without colliding with the envelope.
pub fn validate_key(key: &str) -> Result<()> {
    if key == HASH_SUM_KEY {
        return Err(CacheError::InvalidKey(format!(
            "\"{}\" is reserved for the checksum",
            HASH_SUM_KEY
        )));
    }
    Ok(())
}
