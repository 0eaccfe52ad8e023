//! Nano Cache - maintenance tool for single-file cache stores
//!
//! Opens the store described by the environment (see `CacheConfig::from_env`)
//! and runs one inspection or cleanup command against it.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nano_cache::{CacheConfig, CacheFormat, CacheStore};

/// Inspect and maintain a nano_cache backing file.
#[derive(Parser, Debug)]
#[command(name = "nano_cache", version, about = "Single-file cache store maintenance")]
struct Cli {
    /// Cache directory (overrides CACHE_DIR)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Logical cache name (overrides CACHE_NAME)
    #[arg(long, global = true)]
    name: Option<String>,

    /// On-disk flavor: php, json or text (overrides CACHE_FORMAT)
    #[arg(long, global = true)]
    format: Option<CacheFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print usage counters, backing file and keys
    Stats,
    /// Print the decoded payload stored under a key
    Show {
        key: String,
    },
    /// Store a JSON value under a key
    Put {
        key: String,
        /// JSON document to store
        value: String,
        /// TTL in seconds (defaults to CACHE_TTL)
        #[arg(long)]
        ttl: Option<u64>,
        /// Exempt the record from expiry passes
        #[arg(long)]
        lock: bool,
    },
    /// Evict stale unlocked records
    Purge,
    /// Remove records by key, ignoring locks
    Remove {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Drop every record
    Clear,
    /// Delete the backing file
    Drop,
    /// Delete the backing files of other logical names in the same directory
    RemoveFiles {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nano_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CacheConfig::from_env();
    if let Some(dir) = cli.dir {
        config.directory = dir;
    }
    if let Some(name) = cli.name {
        config.name = name;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Command::Stats => {
            let store = open_store(&config)?;
            let report = json!({
                "file": store.file_path(),
                "stats": store.stats(),
                "hit_rate": store.stats().hit_rate(),
                "keys": store.keys(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Show { key } => match open_store(&config)?.retrieve::<Value>(&key)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => anyhow::bail!("no fresh record under {key:?}"),
        },
        Command::Put {
            key,
            value,
            ttl,
            lock,
        } => {
            let value: Value = serde_json::from_str(&value).context("value must be valid JSON")?;
            let ttl = ttl.unwrap_or(config.default_ttl);
            open_store(&config)?.insert(&key, &value, ttl, lock)?;
            info!("Stored {key:?} with ttl {ttl}s");
        }
        Command::Purge => {
            let evicted = open_store(&config)?.evict_expired()?;
            println!("{}", json!({ "evicted": evicted }));
        }
        Command::Remove { keys } => {
            let results = open_store(&config)?.remove_list(&keys)?;
            let report: serde_json::Map<String, Value> = keys
                .into_iter()
                .zip(results)
                .map(|(key, removed)| (key, Value::Bool(removed)))
                .collect();
            println!("{}", Value::Object(report));
        }
        Command::Clear => {
            let mut store = open_store(&config)?;
            store.clear()?;
            info!("Cleared {}", store.file_path().display());
        }
        Command::Drop => {
            let removed = open_store(&config)?.remove_file();
            println!("{}", json!({ "removed": removed }));
        }
        Command::RemoveFiles { names } => {
            // Other names' files are not loaded, so no store is opened
            let removed = CacheStore::remove_files(&config.directory, &names, config.format);
            println!("{}", json!({ "removed": removed }));
        }
    }

    Ok(())
}

fn open_store(config: &CacheConfig) -> anyhow::Result<CacheStore> {
    let store = CacheStore::open(config.clone()).with_context(|| {
        format!("opening cache {:?} in {}", config.name, config.directory.display())
    })?;
    info!("Opened cache file {}", store.file_path().display());
    Ok(store)
}
