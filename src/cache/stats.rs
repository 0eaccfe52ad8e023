//! Cache Statistics Module
//!
//! Per-instance counters for the get-or-compute protocol and the persistence
//! layer. Counters live in memory only and start at zero on every open.

use serde::Serialize;

// == Cache Stats ==
/// Tracks how a store instance has been used since it was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Resolves answered from a fresh record
    pub hits: u64,
    /// Resolves that had to invoke the refresh callback
    pub misses: u64,
    /// Records removed by expiry passes
    pub evictions: u64,
    /// Successful full-table flushes
    pub saves: u64,
    /// Current number of records in the table
    pub total_entries: usize,
}

impl CacheStats {
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of resolves served without a refresh, or 0.0 before any resolve.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub(crate) fn record_save(&mut self) {
        self.saves += 1;
    }

    pub(crate) fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
