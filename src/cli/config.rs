//! TOML configuration file support.
//!
//! Settings shared by several invocations can live in a config file instead
//! of being repeated on the command line:
//!
//! ```toml
//! # spectradb.toml
//! [store]
//! path = "lab.sqlite"
//! table_name = "Measurements"
//! busy_timeout_ms = 10000
//! journal_mode = "wal"
//! exclusive = true
//!
//! [ingest]
//! collected_by = "jdoe"
//! parallel = true
//!
//! [export]
//! compression_level = 9
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use spectradb::store::{JournalMode, StoreConfig};

/// Database file used when neither `--db` nor the config names one.
pub const DEFAULT_DB_PATH: &str = "spectradb.sqlite";

/// Root configuration structure for spectradb.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub store: StoreSection,

    /// Settings for the ingest command.
    #[serde(default)]
    pub ingest: IngestSection,

    /// Settings for the export command.
    #[serde(default)]
    pub export: ExportSection,
}

/// Database settings; unset fields keep the store defaults.
#[derive(Debug, Default, Deserialize)]
pub struct StoreSection {
    /// Database file.
    pub path: Option<PathBuf>,

    /// Measurement table name.
    pub table_name: Option<String>,

    /// Lock wait in milliseconds.
    pub busy_timeout_ms: Option<u64>,

    /// SQLite journal mode (`wal` or `delete`).
    pub journal_mode: Option<JournalMode>,

    /// Hold the database lock while the store is open.
    pub exclusive: Option<bool>,
}

/// Configuration for the ingest command.
#[derive(Debug, Default, Deserialize)]
pub struct IngestSection {
    /// Collector recorded on every ingested sample.
    pub collected_by: Option<String>,

    /// Decode files in parallel (requires the parallel feature).
    pub parallel: Option<bool>,
}

/// Configuration for the export command.
#[derive(Debug, Default, Deserialize)]
pub struct ExportSection {
    /// ZSTD compression level (1-22).
    pub compression_level: Option<i32>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Resolve the store configuration; `db` takes precedence over the file.
    pub fn store_config(&self, db: Option<PathBuf>) -> Result<StoreConfig> {
        let path = db
            .or_else(|| self.store.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let mut config = StoreConfig::new(path);
        if let Some(table_name) = &self.store.table_name {
            config = config.with_table_name(table_name.clone());
        }
        if let Some(timeout) = self.store.busy_timeout_ms {
            config.busy_timeout_ms = timeout;
        }
        if let Some(mode) = self.store.journal_mode {
            config = config.with_journal_mode(mode);
        }
        if let Some(exclusive) = self.store.exclusive {
            config = config.with_exclusive(exclusive);
        }

        config.validate().context("Invalid [store] configuration")?;
        Ok(config)
    }
}
