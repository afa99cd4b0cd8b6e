//! NMR point-list decoder.
//!
//! The spectrometer exports a `.txt` file with an optional title line
//! followed by rows of `index, intensity, <unused>, ppm`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use log::debug;

use super::{Decoder, DecodeError, Provenance};
use crate::record::{axes, CanonicalRecord, Instrument, Payload, SampleSet, SignalMetadata};

const INTENSITY_FIELD: usize = 1;
const PPM_FIELD: usize = 3;
const FIELDS_PER_ROW: usize = 4;

/// Decoder for NMR `.txt` point lists
#[derive(Debug, Clone, Copy, Default)]
pub struct NmrDecoder;

impl Decoder for NmrDecoder {
    const INSTRUMENT: Instrument = Instrument::Nmr;
    const EXTENSION: &'static str = "txt";

    fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError> {
        self.validate(path)?;
        let provenance = Provenance::from_path(path)?;
        let reader = BufReader::new(File::open(path)?);
        let record = self.decode_reader(reader, &provenance)?;
        debug!(
            "Decoded NMR spectrum from {} ({} points)",
            provenance.filename,
            record.payload().len()
        );
        Ok(SampleSet::from_records([record]))
    }
}

impl NmrDecoder {
    /// Decode a point list already opened as a reader
    pub fn decode_reader<R: Read>(
        &self,
        reader: R,
        provenance: &Provenance,
    ) -> Result<CanonicalRecord, DecodeError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut intensities = Vec::new();
        let mut ppm = Vec::new();

        for (position, result) in csv_reader.records().enumerate() {
            let row = result?;
            if row.iter().all(str::is_empty) {
                continue;
            }

            // Title lines precede the first row with a numeric index
            let leading_numeric = row.get(0).is_some_and(|f| f.parse::<f64>().is_ok());
            if intensities.is_empty() && !leading_numeric {
                continue;
            }

            if row.len() < FIELDS_PER_ROW {
                return Err(DecodeError::format(format!(
                    "record {}: expected {FIELDS_PER_ROW} fields, found {}",
                    position + 1,
                    row.len()
                )));
            }
            intensities.push(numeric_field(&row, INTENSITY_FIELD, position)?);
            ppm.push(numeric_field(&row, PPM_FIELD, position)?);
        }

        if intensities.is_empty() {
            return Err(DecodeError::format("no data rows"));
        }

        let mut signal_metadata = SignalMetadata::new();
        signal_metadata.insert(axes::PPM.to_string(), ppm);

        Ok(CanonicalRecord::new(
            Self::INSTRUMENT,
            provenance.measurement_date,
            provenance.filename.clone(),
            signal_metadata,
            Payload::Spectrum(intensities),
        )?)
    }
}

fn numeric_field(
    row: &csv::StringRecord,
    index: usize,
    position: usize,
) -> Result<f64, DecodeError> {
    let text = row.get(index).unwrap_or_default();
    text.parse::<f64>().map_err(|_| {
        DecodeError::format(format!(
            "record {}: field {} is not numeric: '{text}'",
            position + 1,
            index + 1
        ))
    })
}
