//! # SpectraDB - Laboratory Spectroscopy Measurement Store
//!
//! `spectradb` turns the native exports of laboratory spectrometers into one
//! canonical record shape and keeps those records in a deduplicating SQLite
//! database.
//!
//! ## Key Features
//!
//! - **Instrument Decoders**: FTIR binary `.spa` dumps, multi-sample
//!   fluorescence excitation/emission `.csv` exports and NMR `.txt` point
//!   lists all decode to [`record::CanonicalRecord`].
//!
//! - **Per-Sample Annotation**: Records decoded from one file form a
//!   [`record::SampleSet`] numbered `S1..Sn`, so individual samples can be
//!   named, annotated or dropped before they are stored.
//!
//! - **Deduplicating Store**: [`store::Store`] hands out per-instrument
//!   identifiers (`INS_3_17`) that are never reused and rejects duplicate
//!   measurements one record at a time, without failing the batch.
//!
//! - **Tabular Export**: Stored measurements project to an Arrow record
//!   batch and export to Parquet or CSV.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spectradb::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut samples = decode_path(Path::new("plate.csv"))?;
//! println!("{samples}");
//!
//! samples.amend(SampleKey::new(1), MetadataUpdate::new().internal_code("LAB-42"))?;
//! samples.remove(SampleKey::new(3))?;
//!
//! let store = Store::new(StoreConfig::new("lab.sqlite"))?;
//! store.open()?;
//! let report = store.add(samples.records_mut())?;
//! println!("{report}");
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Instrument Codes
//!
//! | Instrument | Code | Extension |
//! |------------|------|-----------|
//! | FTIR | `INS_1` | `.spa` |
//! | NMR | `INS_2` | `.txt` |
//! | Fluorescence | `INS_3` | `.csv` |
//! | GC (reserved) | `INS_4` | - |
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`record`]: Canonical record model and per-file sample sets
//! - [`formats`]: Instrument file decoders
//! - [`store`]: SQLite persistence with identifier allocation
//! - [`schema`]: Arrow schema of the tabular projection
//! - [`projection`]: Records to Arrow record batches and CSV
//! - [`measurement_writer`]: Parquet export

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod formats;
pub mod measurement_writer;
pub mod projection;
pub mod record;
pub mod schema;
pub mod store;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::formats::{
        decode_many, decode_path, DecodeError, Decoder, DecoderKind, FluorescenceDecoder,
        FtirDecoder, NmrDecoder, Provenance,
    };
    pub use crate::measurement_writer::{
        MeasurementWriter, MeasurementWriterConfig, MeasurementWriterError,
        MeasurementWriterStats,
    };
    pub use crate::projection::{project, write_csv, ProjectionError, TabularRow};
    pub use crate::record::{
        axes, CanonicalRecord, Instrument, MetadataUpdate, Payload, RecordError, SampleKey,
        SampleSet, SignalMetadata,
    };
    pub use crate::schema::{columns, create_measurement_schema, SPECTRADB_FORMAT_VERSION};
    pub use crate::store::{
        AddOptions, AddReport, ConflictError, MissingPolicy, RemoveReport, Store, StoreConfig,
        StoreError, StoredMeasurement,
    };
}
