//! Error types for the canonical store.

use thiserror::Error;

use crate::record::Instrument;

/// Errors that abort a store operation
#[derive(Error, Debug)]
pub enum StoreError {
    /// Operation not allowed in the current state (closed store, double
    /// open, unknown id under the strict policy, nothing to commit, ...)
    #[error("Store usage error: {0}")]
    UsageError(String),

    /// SQLite failure unrelated to duplicate detection
    #[error("Storage error: {0}")]
    StorageError(#[from] rusqlite::Error),

    /// Payload or axes could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid store configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A persisted row could not be turned back into a measurement
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Another thread panicked while holding the store
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::UsageError(message.into())
    }

    pub(crate) fn closed() -> Self {
        Self::usage("store is not open")
    }

    /// Whether SQLite rejected the statement because of the named unique
    /// index. Other constraint failures stay storage errors.
    pub(crate) fn is_unique_violation_of(&self, index_name: &str) -> bool {
        match self {
            StoreError::StorageError(rusqlite::Error::SqliteFailure(err, Some(message))) => {
                err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && message.contains(index_name)
            }
            _ => false,
        }
    }
}

/// A record that duplicates an existing row.
///
/// Recoverable: only the offending record is dropped, the rest of the batch
/// is persisted. Reported through [`AddReport::conflicts`](super::AddReport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "record {index} duplicates an existing {instrument} measurement \
     (sample name {}, internal code {}, comments {})",
    display_field(.sample_name),
    display_field(.internal_code),
    display_field(.comments)
)]
pub struct ConflictError {
    /// Position of the record in the submitted batch
    pub index: usize,
    /// Instrument of the rejected record
    pub instrument: Instrument,
    /// Sample name of the rejected record
    pub sample_name: Option<String>,
    /// Internal code of the rejected record
    pub internal_code: Option<String>,
    /// Comments of the rejected record
    pub comments: Option<String>,
}

fn display_field(value: &Option<String>) -> String {
    match value {
        Some(text) => format!("'{text}'"),
        None => "<unset>".to_string(),
    }
}
