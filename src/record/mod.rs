//! # Canonical Record Model
//!
//! Every decoder in [`crate::formats`] normalizes its input into
//! [`CanonicalRecord`]s, and the [`crate::store`] persists them. A record
//! carries the instrument, the provenance of the source file, free-text
//! sample annotations, the signal axes and the measured payload.
//!
//! Records decoded from one file are grouped in a [`SampleSet`], which
//! numbers them `S1..Sn` so callers can amend or drop individual samples
//! before persisting the rest.

mod canonical;
mod error;
mod instrument;
mod samples;


pub use canonical::{
    axes, file_name_of, modification_date, CanonicalRecord, MetadataUpdate, Payload,
    SignalMetadata,
};
pub use error::RecordError;
pub use instrument::Instrument;
pub use samples::{SampleKey, SampleSet};
