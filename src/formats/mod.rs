//! Instrument file decoders.
//!
//! Each supported instrument has one decoder that turns its native export
//! into [`CanonicalRecord`](crate::record::CanonicalRecord)s:
//!
//! - [`ftir`] - fixed-layout binary `.spa` files (one spectrum per file)
//! - [`fluorescence`] - multi-sample excitation/emission `.csv` exports
//! - [`nmr`] - comma-delimited `.txt` point lists
//!
//! All decoders implement [`Decoder`]. [`DecoderKind`] is the closed tag that
//! picks one for an [`Instrument`] or a file extension. Decoders hold no
//! state, so independent files can be decoded concurrently with
//! [`decode_many`].

mod error;
pub mod fluorescence;
pub mod ftir;
pub mod nmr;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::record::{file_name_of, modification_date, Instrument, SampleSet};

pub use error::DecodeError;
pub use fluorescence::FluorescenceDecoder;
pub use ftir::FtirDecoder;
pub use nmr::NmrDecoder;

/// Where a decoded record came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Base name of the source file
    pub filename: String,
    /// Calendar date of the file's modification time
    pub measurement_date: NaiveDate,
}

impl Provenance {
    /// Read provenance from the file system
    pub fn from_path(path: &Path) -> Result<Self, DecodeError> {
        Ok(Self {
            filename: file_name_of(path),
            measurement_date: modification_date(path)?,
        })
    }
}

/// Capability shared by all instrument decoders
pub trait Decoder {
    /// Instrument whose files this decoder understands
    const INSTRUMENT: Instrument;

    /// Accepted file extension, lowercase and without the dot
    const EXTENSION: &'static str;

    /// Check the file extension. Never touches the file.
    fn validate(&self, path: &Path) -> Result<(), DecodeError> {
        check_extension(path, Self::EXTENSION)
    }

    /// Validate, then decode the file into one record per sample
    fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError>;
}

/// Case-insensitive extension check
pub(crate) fn check_extension(path: &Path, expected: &'static str) -> Result<(), DecodeError> {
    let matches = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(expected));
    if matches {
        Ok(())
    } else {
        Err(DecodeError::ValidationError {
            path: path.to_path_buf(),
            expected,
        })
    }
}

/// Closed set of available decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// [`FtirDecoder`]
    Ftir,
    /// [`FluorescenceDecoder`]
    Fluorescence,
    /// [`NmrDecoder`]
    Nmr,
}

impl DecoderKind {
    /// Every decoder kind
    pub const ALL: [DecoderKind; 3] = [
        DecoderKind::Ftir,
        DecoderKind::Fluorescence,
        DecoderKind::Nmr,
    ];

    /// Decoder for an instrument
    pub fn for_instrument(instrument: Instrument) -> Result<Self, DecodeError> {
        match instrument {
            Instrument::Ftir => Ok(DecoderKind::Ftir),
            Instrument::Fluorescence => Ok(DecoderKind::Fluorescence),
            Instrument::Nmr => Ok(DecoderKind::Nmr),
            Instrument::Gc => Err(DecodeError::UnsupportedInstrument(instrument)),
        }
    }

    /// Pick a decoder from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| check_extension(path, kind.extension()).is_ok())
    }

    /// Instrument handled by this decoder
    pub fn instrument(&self) -> Instrument {
        match self {
            DecoderKind::Ftir => FtirDecoder::INSTRUMENT,
            DecoderKind::Fluorescence => FluorescenceDecoder::INSTRUMENT,
            DecoderKind::Nmr => NmrDecoder::INSTRUMENT,
        }
    }

    /// File extension accepted by this decoder
    pub fn extension(&self) -> &'static str {
        match self {
            DecoderKind::Ftir => FtirDecoder::EXTENSION,
            DecoderKind::Fluorescence => FluorescenceDecoder::EXTENSION,
            DecoderKind::Nmr => NmrDecoder::EXTENSION,
        }
    }

    /// Run the decoder's extension check
    pub fn validate(&self, path: &Path) -> Result<(), DecodeError> {
        match self {
            DecoderKind::Ftir => FtirDecoder.validate(path),
            DecoderKind::Fluorescence => FluorescenceDecoder.validate(path),
            DecoderKind::Nmr => NmrDecoder.validate(path),
        }
    }

    /// Run the decoder
    pub fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError> {
        match self {
            DecoderKind::Ftir => FtirDecoder.decode(path),
            DecoderKind::Fluorescence => FluorescenceDecoder.decode(path),
            DecoderKind::Nmr => NmrDecoder.decode(path),
        }
    }
}

/// Decode a single file, choosing the decoder by extension
pub fn decode_path(path: &Path) -> Result<SampleSet, DecodeError> {
    let kind = DecoderKind::from_path(path).ok_or_else(|| DecodeError::ValidationError {
        path: path.to_path_buf(),
        expected: "spa, .csv or .txt",
    })?;
    kind.decode(path)
}

/// Decode independent files, returning one result per path in input order.
///
/// With the `parallel` feature the files are decoded on the rayon pool.
pub fn decode_many(paths: &[PathBuf]) -> Vec<Result<SampleSet, DecodeError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        paths.par_iter().map(|path| decode_path(path)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        paths.iter().map(|path| decode_path(path)).collect()
    }
}
