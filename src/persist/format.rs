//! Output flavors and backing file naming.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// First line written to `Php` cache files when secure access is on. A web
/// server executing the file answers "Access denied" and stops there.
pub const ACCESS_DENIED_PREAMBLE: &str =
    r#"<?php header("Content-type: text/plain"); die("Access denied"); ?>"#;

/// On-disk flavor of a cache file. Selects the suffix and whether the
/// access-denial preamble applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFormat {
    /// Script flavor, directly servable as code
    Php,
    /// JSON flavor
    #[default]
    Json,
    /// Plain text flavor
    Text,
}

impl CacheFormat {
    /// File suffix for this flavor, leading dot included.
    pub fn extension(self) -> &'static str {
        match self {
            CacheFormat::Php => ".catch.php",
            CacheFormat::Json => ".json",
            CacheFormat::Text => ".txt",
        }
    }

    /// Returns the preamble line to write, if any.
    pub fn preamble(self, secure_access: bool) -> Option<&'static str> {
        match self {
            CacheFormat::Php if secure_access => Some(ACCESS_DENIED_PREAMBLE),
            _ => None,
        }
    }
}

impl fmt::Display for CacheFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheFormat::Php => "php",
            CacheFormat::Json => "json",
            CacheFormat::Text => "text",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "php" => Ok(CacheFormat::Php),
            "json" => Ok(CacheFormat::Json),
            "text" | "txt" => Ok(CacheFormat::Text),
            other => Err(format!("unknown cache format: {other}")),
        }
    }
}

/// Hashes a logical cache name into the stem used on disk (MD5, lowercase hex).
pub fn hash_name(name: &str) -> String {
    format!("{:x}", md5::compute(name.as_bytes()))
}

/// Builds `directory / md5(name) + extension`.
pub fn cache_file_path(directory: &Path, name: &str, format: CacheFormat) -> PathBuf {
    directory.join(format!("{}{}", hash_name(name), format.extension()))
}

/// Deletes the backing file of every logical name under `directory`.
///
/// Names without a file are skipped. Returns true only if every file that
/// existed was deleted.
pub fn remove_files<S: AsRef<str>>(directory: &Path, names: &[S], format: CacheFormat) -> bool {
    let mut all_removed = true;
    for name in names {
        let path = cache_file_path(directory, name.as_ref(), format);
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed cache file {}", path.display()),
            Err(e) => {
                warn!("Failed to remove cache file {}: {}", path.display(), e);
                all_removed = false;
            }
        }
    }
    all_removed
}
