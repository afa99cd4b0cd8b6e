//! Error types for instrument file decoding.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::{Instrument, RecordError};

/// Errors that can occur while validating or decoding an instrument file.
///
/// A failed decode never yields a partially populated record.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// File extension does not match the decoder; raised before any byte is read
    #[error("Invalid file extension for {}: expected .{expected}", path.display())]
    ValidationError {
        /// Offending path
        path: PathBuf,
        /// Extension the decoder accepts (without the dot)
        expected: &'static str,
    },

    /// Structurally malformed content (missing sentinel, short read, bad cell, ...)
    #[error("Malformed file content: {0}")]
    FormatError(String),

    /// Malformed CSV framing
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// File could not be opened or read
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No decoder exists for the instrument
    #[error("No decoder available for instrument {0}")]
    UnsupportedInstrument(Instrument),
}

impl DecodeError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::FormatError(message.into())
    }

    /// Whether the error describes malformed content rather than an
    /// unreadable file or a wrong extension
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::FormatError(_) | Self::CsvError(_))
    }
}

impl From<RecordError> for DecodeError {
    fn from(error: RecordError) -> Self {
        DecodeError::FormatError(error.to_string())
    }
}
