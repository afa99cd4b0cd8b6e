use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::StoreError;

/// Default name of the measurement table
pub const DEFAULT_TABLE_NAME: &str = "Measurements";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log
    #[default]
    Wal,
    /// Rollback journal, deleted after each transaction
    Delete,
}

impl JournalMode {
    /// Value passed to `PRAGMA journal_mode`
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration of a [`Store`](super::Store)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Database file; `:memory:` opens a private in-memory database
    pub path: PathBuf,
    /// Measurement table name; the counter table is derived from it
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// How long a writer waits for a competing lock, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode applied on open
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Hold the database lock for the lifetime of the connection
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

const fn default_exclusive() -> bool {
    true
}

impl StoreConfig {
    /// Configuration with defaults for everything but the path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table_name: default_table_name(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
            exclusive: default_exclusive(),
        }
    }

    /// Private in-memory database
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// Use a different measurement table
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Set the journal mode
    pub fn with_journal_mode(mut self, journal_mode: JournalMode) -> Self {
        self.journal_mode = journal_mode;
        self
    }

    /// Enable or disable exclusive locking
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Check values that SQLite cannot validate for us
    pub fn validate(&self) -> Result<(), StoreError> {
        if !is_identifier(&self.table_name) {
            return Err(StoreError::ConfigError(format!(
                "invalid table name '{}': expected [A-Za-z_][A-Za-z0-9_]*",
                self.table_name
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::ConfigError("store path is empty".to_string()));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
