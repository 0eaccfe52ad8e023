//! Checksummed envelope around the record table.
//!
//! The table is written as one compact JSON object with an extra `hash-sum`
//! field holding the MD5 of the object as it serializes without that field.
//! Keys serialize in sorted order, which makes that form canonical.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheTable, HASH_SUM_KEY};
use crate::error::{CacheError, Result};

/// MD5 (lowercase hex) of the canonical serialization of `value`.
pub fn checksum(value: &Value) -> String {
    format!("{:x}", md5::compute(value.to_string()))
}

/// Drops everything up to and including the first newline, if there is one.
pub fn strip_preamble(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == b'\n') {
        Some(position) => &raw[position + 1..],
        None => raw,
    }
}

/// Writes the whole table to `path`.
///
/// Creates the parent directory when missing, then writes to a sibling
/// temporary file and renames it over `path`.
pub fn save_table(path: &Path, table: &CacheTable, preamble: Option<&str>) -> Result<()> {
    let persist_failure = |path: &Path, source: io::Error| CacheError::PersistFailure {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            create_cache_dir(dir).map_err(|e| persist_failure(dir, e))?;
        }
    }

    let body = seal(table).map_err(|e| persist_failure(path, e.into()))?;
    let mut contents = String::with_capacity(body.len() + 80);
    if let Some(line) = preamble {
        contents.push_str(line);
        contents.push('\n');
    }
    contents.push_str(&body);

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(persist_failure(path, e));
    }

    debug!("Saved {} cache records to {}", table.len(), path.display());
    Ok(())
}

/// Reads and verifies the table stored at `path`.
///
/// A file that fails to parse, lacks the checksum, or fails verification is
/// deleted before `CorruptFile` is returned.
pub fn load_table(path: &Path) -> Result<CacheTable> {
    let raw = fs::read(path).map_err(|source| CacheError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.is_empty() {
        return Err(CacheError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "cache file is empty"),
        });
    }

    match open(strip_preamble(&raw)) {
        Ok(table) => {
            debug!("Loaded {} cache records from {}", table.len(), path.display());
            Ok(table)
        }
        Err(reason) => {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to delete corrupt cache file {}: {}", path.display(), e);
            } else {
                warn!("Deleted corrupt cache file {}: {}", path.display(), reason);
            }
            Err(CacheError::CorruptFile {
                path: path.to_path_buf(),
                reason,
            })
        }
    }
}

fn seal(table: &CacheTable) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(table)?;
    let sum = checksum(&value);
    if let Value::Object(map) = &mut value {
        map.insert(HASH_SUM_KEY.to_string(), Value::String(sum));
    }
    serde_json::to_string(&value)
}

fn open(body: &[u8]) -> std::result::Result<CacheTable, String> {
    let mut value: Value =
        serde_json::from_slice(body).map_err(|e| format!("cannot deserialize: {e}"))?;

    let stored = match value.as_object_mut() {
        Some(map) => map.remove(HASH_SUM_KEY),
        None => return Err("expected a JSON object".to_string()),
    };
    let stored = match stored {
        Some(Value::String(sum)) => sum,
        Some(_) => return Err("hash-sum is not a string".to_string()),
        None => return Err("no hash found".to_string()),
    };

    let actual = checksum(&value);
    if stored != actual {
        return Err(format!("miss-hashed: expected {stored}, got {actual}"));
    }

    serde_json::from_value(value).map_err(|e| format!("invalid record: {e}"))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn create_cache_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_cache_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}
