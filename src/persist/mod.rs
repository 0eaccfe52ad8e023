//! Persistence Module
//!
//! Everything that touches the backing file: output flavors and hashed file
//! paths, the checksummed envelope around the record table, and the
//! reversible payload transform applied to each record.

mod envelope;
mod format;
mod payload;

pub use envelope::{checksum, load_table, save_table, strip_preamble};
pub use format::{cache_file_path, hash_name, remove_files, CacheFormat, ACCESS_DENIED_PREAMBLE};
pub use payload::PayloadCodec;
