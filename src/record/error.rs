use super::{Instrument, SampleKey};

/// Errors raised by the canonical record model
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Sample identifier is not present in the sample table
    #[error("Sample identifier '{0}' not found")]
    UnknownSample(SampleKey),

    /// Metadata amendment attempted on a record that is already persisted
    #[error("Record is already persisted as {0}; its metadata can no longer be amended")]
    AlreadyPersisted(String),

    /// Payload dimensions do not match the signal axes
    #[error(
        "{instrument} payload does not match axis '{axis}': \
         expected {expected} values, found {actual}"
    )]
    AxisMismatch {
        /// Instrument of the offending record
        instrument: Instrument,
        /// Axis label that was checked
        axis: String,
        /// Axis length
        expected: usize,
        /// Payload length along that axis
        actual: usize,
    },

    /// Instrument code not recognized
    #[error("Unknown instrument code: {0}")]
    UnknownInstrument(String),
}
