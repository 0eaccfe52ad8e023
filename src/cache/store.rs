//! Cache Store Module
//!
//! Main cache engine: a record table loaded from and flushed to one backing
//! file, with the get-or-compute protocol on top.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp, validate_key, CacheRecord, CacheStats, CacheTable};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::persist::{cache_file_path, load_table, remove_files, save_table, CacheFormat, PayloadCodec};

// == Cache Store ==
/// Single-file cache store.
///
/// Every mutation rewrites the whole backing file. When a flush fails the
/// in-memory table is already ahead of disk; call [`CacheStore::reload`] or
/// retry the write before trusting later reads.
#[derive(Debug)]
pub struct CacheStore {
    /// Active configuration
    config: CacheConfig,
    /// Backing file derived from directory, hashed name and format
    path: PathBuf,
    /// In-memory records
    table: CacheTable,
    /// Payload transform matching `config.base64`
    codec: PayloadCodec,
    /// Value produced by the latest resolve
    response: Option<Value>,
    /// Usage counters
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Opens the store described by `config`.
    ///
    /// A missing backing file starts an empty table. A corrupt one is deleted
    /// and reported as `CorruptFile`. Stale unlocked records are evicted right
    /// away when `delete_expired` is on.
    pub fn open(config: CacheConfig) -> Result<Self> {
        let path = cache_file_path(&config.directory, &config.name, config.format);
        let table = if path.exists() {
            load_table(&path)?
        } else {
            debug!("No cache file at {}, starting empty", path.display());
            CacheTable::new()
        };

        let mut store = Self {
            codec: PayloadCodec::new(config.base64),
            config,
            path,
            table,
            response: None,
            stats: CacheStats::new(),
        };

        if store.config.delete_expired {
            store.evict_expired()?;
        }
        Ok(store)
    }

    // == Setters ==
    /// Points the store at a new directory. The table is kept and written
    /// there on the next mutation.
    pub fn set_cache_location(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.config.directory = directory.into();
        self.update_path()
    }

    /// Renames the logical cache.
    pub fn set_filename(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.name = name.into();
        self.update_path()
    }

    /// Switches the on-disk flavor.
    pub fn set_format(&mut self, format: CacheFormat) -> &mut Self {
        self.config.format = format;
        self.update_path()
    }

    /// Turns debug mode on or off.
    pub fn set_debug_mode(&mut self, debug: bool) -> &mut Self {
        self.config.debug = debug;
        self
    }

    /// Sets the TTL used by [`CacheStore::resolve`] and [`CacheStore::refresh`].
    pub fn set_expire(&mut self, ttl: u64) -> &mut Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Toggles the base64 payload transform.
    ///
    /// Records written under the other setting can no longer be decoded.
    pub fn enable_base64(&mut self, encode: bool) -> &mut Self {
        self.config.base64 = encode;
        self.codec = PayloadCodec::new(encode);
        self
    }

    /// Toggles eviction before reads; enabling it runs a pass immediately.
    pub fn enable_delete_expired(&mut self, allow: bool) -> Result<&mut Self> {
        self.config.delete_expired = allow;
        if allow {
            self.evict_expired()?;
        }
        Ok(self)
    }

    /// Toggles the access-denial preamble for `Php` files.
    pub fn enable_secure_access(&mut self, secure: bool) -> &mut Self {
        self.config.secure_access = secure;
        self
    }

    fn update_path(&mut self) -> &mut Self {
        self.path = cache_file_path(&self.config.directory, &self.config.name, self.config.format);
        self
    }

    // == Record Table ==
    /// Returns true if a record exists under `key`, stale or not.
    pub fn has_entry(&self, key: &str) -> bool {
        self.table.has_entry(key)
    }

    /// Returns true if `key` is stale. Unknown keys are always stale.
    pub fn is_expired(&self, key: &str) -> bool {
        self.table.is_expired_at(key, current_timestamp())
    }

    /// Removes one record regardless of its lock flag and flushes.
    ///
    /// Returns whether the key existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        if self.table.remove(key).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    /// Removes each key in turn, one result per key.
    pub fn remove_list<S: AsRef<str>>(&mut self, keys: &[S]) -> Result<Vec<bool>> {
        keys.iter().map(|key| self.remove(key.as_ref())).collect()
    }

    // == Evict Expired ==
    /// Removes every stale, unlocked record and returns how many went.
    ///
    /// Flushes only when something was removed.
    pub fn evict_expired(&mut self) -> Result<usize> {
        let evicted = self.table.evict_expired_at(current_timestamp());
        let count = evicted.len();
        if count > 0 {
            info!("Evicted {} expired cache records from {}", count, self.path.display());
            self.stats.record_evictions(count);
            self.flush()?;
        }
        Ok(count)
    }

    // == Insert ==
    /// Writes `data` under `key` and flushes.
    ///
    /// In debug mode the stored TTL is forced to one second.
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        data: &T,
        ttl: u64,
        locked: bool,
    ) -> Result<()> {
        validate_key(key)?;
        let payload = self.codec.encode(key, data)?;
        let ttl = if self.config.debug { 1 } else { ttl };
        self.table.insert(key, CacheRecord::new(payload, ttl, locked))?;
        self.flush()
    }

    // == Retrieve ==
    /// Reads `key` back from the table, running an eviction pass first when
    /// `delete_expired` is on.
    pub fn retrieve<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.retrieve_value(key)? {
            Some(value) => from_value(key, value).map(Some),
            None => Ok(None),
        }
    }

    fn retrieve_value(&mut self, key: &str) -> Result<Option<Value>> {
        if self.config.delete_expired {
            self.evict_expired()?;
        }
        match self.table.get(key) {
            Some(record) => self.codec.decode(key, &record.payload).map(Some),
            None => Ok(None),
        }
    }

    // == Resolve ==
    /// Returns the cached value for `key`, recomputing it with `refresh` when
    /// stale. Uses the default TTL and writes an unlocked record.
    pub fn resolve<T, F>(&mut self, key: &str, refresh: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let ttl = self.config.default_ttl;
        self.resolve_with(key, refresh, ttl, false)
    }

    /// Like [`CacheStore::resolve`] with an explicit TTL and lock flag.
    pub fn resolve_with<T, F>(
        &mut self,
        key: &str,
        refresh: F,
        ttl: u64,
        locked: bool,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.try_resolve_with(key, || Ok(refresh()), ttl, locked)
    }

    /// Get-or-compute with a fallible refresh callback.
    ///
    /// The callback runs when `key` is stale or absent, or always in debug
    /// mode. Its error is returned unchanged. Empty results (null, empty
    /// string, empty array or object) are not persisted.
    pub fn try_resolve_with<T, E, F>(
        &mut self,
        key: &str,
        refresh: F,
        ttl: u64,
        locked: bool,
    ) -> std::result::Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if self.config.debug {
            self.stats.record_miss();
            let data = refresh()?;
            self.response = Some(to_value(key, &data)?);
            return Ok(Some(data));
        }

        self.refresh_if_expired(key, refresh, ttl, locked)?;
        self.response = self.retrieve_value(key)?;
        match self.response.clone() {
            Some(value) => Ok(Some(from_value(key, value)?)),
            None => Ok(None),
        }
    }

    /// Same as [`CacheStore::resolve`] but only updates the current response.
    pub fn refresh<T, F>(&mut self, key: &str, refresh: F) -> Result<()>
    where
        T: Serialize,
        F: FnMut() -> T,
    {
        let ttl = self.config.default_ttl;
        self.refresh_with(key, refresh, ttl, false)
    }

    /// Get-or-compute that only updates the current response.
    ///
    /// In debug mode the callback result becomes the response first, then
    /// the normal stale check runs as well, so a stale key invokes the
    /// callback a second time and is written with a one second TTL.
    pub fn refresh_with<T, F>(
        &mut self,
        key: &str,
        mut refresh: F,
        ttl: u64,
        locked: bool,
    ) -> Result<()>
    where
        T: Serialize,
        F: FnMut() -> T,
    {
        if self.config.debug {
            self.stats.record_miss();
            self.response = Some(to_value(key, &refresh())?);
        }

        self.refresh_if_expired(key, || Ok::<T, CacheError>(refresh()), ttl, locked)?;
        self.response = self.retrieve_value(key)?;
        Ok(())
    }

    fn refresh_if_expired<T, E, F>(
        &mut self,
        key: &str,
        refresh: F,
        ttl: u64,
        locked: bool,
    ) -> std::result::Result<(), E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if !self.is_expired(key) {
            self.stats.record_hit();
            return Ok(());
        }

        self.stats.record_miss();
        debug!("Cache key {} is stale, refreshing", key);
        let data = refresh()?;
        if !is_empty_payload(&to_value(key, &data)?) {
            self.insert(key, &data, ttl, locked)?;
        }
        Ok(())
    }

    // == Response Accessors ==
    /// Returns the latest response, or one named field of it.
    pub fn get(&self, field: Option<&str>) -> Option<&Value> {
        let response = self.response.as_ref()?;
        match field {
            None | Some("") => Some(response),
            Some(name) => response.get(name),
        }
    }

    /// Returns the `"row"` field of the latest response, or an empty object.
    pub fn row(&self) -> Value {
        self.get(Some("row"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    // == File Management ==
    /// Empties the table and flushes.
    pub fn clear(&mut self) -> Result<()> {
        self.table.clear();
        self.flush()
    }

    /// Deletes the backing file. Returns false if there was none.
    pub fn remove_file(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove cache file {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Deletes the backing files of `names` under `directory`.
    pub fn remove_files<S: AsRef<str>>(directory: &Path, names: &[S], format: CacheFormat) -> bool {
        remove_files(directory, names, format)
    }

    /// Replaces the table with the backing file's contents.
    pub fn reload(&mut self) -> Result<()> {
        self.table = if self.path.exists() {
            load_table(&self.path)?
        } else {
            CacheTable::new()
        };
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let preamble = self.config.format.preamble(self.config.secure_access);
        match save_table(&self.path, &self.table, preamble) {
            Ok(()) => {
                self.stats.record_save();
                Ok(())
            }
            Err(e) => {
                warn!("Cache flush failed, table is ahead of disk: {}", e);
                Err(e)
            }
        }
    }

    // == Introspection ==
    /// Path of the backing file.
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Keys currently held, in canonical order.
    pub fn keys(&self) -> Vec<String> {
        self.table.keys().map(str::to_string).collect()
    }

    /// Read-only view of a record.
    pub fn record(&self, key: &str) -> Option<&CacheRecord> {
        self.table.get(key)
    }

    /// Returns current usage statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.table.len());
        stats
    }

    /// Returns the current number of records.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn to_value<T: Serialize + ?Sized>(key: &str, data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| CacheError::Payload {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn from_value<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CacheError::Payload {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
