//! Fluorescence excitation/emission CSV decoder.
//!
//! One export holds several samples, each scanned at several excitation
//! wavelengths. Intensity columns are labelled `<sample>_EX_<wavelength>`.
//! Two layouts are recognised:
//!
//! - *paired*: every labelled column carries emission wavelengths and the
//!   unlabelled column to its right carries the intensities of that scan
//!   (the spectrometer's native export, with a `Wavelength (nm),Data`
//!   sub-header and a trailing instrument report).
//! - *flat*: the first column is the shared emission axis and every labelled
//!   column directly carries intensities.
//!
//! The layout is paired when every label is followed by an empty header
//! cell. Sample names may contain unquoted commas: the pieces a CSV reader
//! splits them into are joined back onto their label before any column is
//! matched.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, trace};

use super::{Decoder, DecodeError, Provenance};
use crate::record::{
    axes, CanonicalRecord, Instrument, MetadataUpdate, Payload, SampleSet, SignalMetadata,
};

/// Separator between sample name and excitation wavelength in header cells
pub const EXCITATION_MARKER: &str = "_EX_";

/// Decoder for multi-sample fluorescence `.csv` exports
#[derive(Debug, Clone, Copy, Default)]
pub struct FluorescenceDecoder;

impl Decoder for FluorescenceDecoder {
    const INSTRUMENT: Instrument = Instrument::Fluorescence;
    const EXTENSION: &'static str = "csv";

    fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError> {
        self.validate(path)?;
        let provenance = Provenance::from_path(path)?;
        let reader = BufReader::new(File::open(path)?);
        let records = self.decode_reader(reader, &provenance)?;
        debug!(
            "Decoded {} fluorescence samples from {}",
            records.len(),
            provenance.filename
        );
        Ok(SampleSet::from_records(records))
    }
}

/// How intensities are laid out relative to their header cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Paired,
    Flat,
}

impl Layout {
    /// Paired when every label is followed by an empty cell or ends the row
    /// and at least one label is followed by an empty cell
    fn detect(header: &[String]) -> Self {
        let followers: Vec<Option<&String>> = header
            .iter()
            .enumerate()
            .filter(|(_, label)| is_label(label))
            .map(|(index, _)| header.get(index + 1))
            .collect();
        let all_open = followers
            .iter()
            .all(|next| next.map_or(true, |cell| cell.trim().is_empty()));
        let any_followed = followers.iter().any(Option::is_some);
        if all_open && any_followed {
            Layout::Paired
        } else {
            Layout::Flat
        }
    }

    fn intensity_column(self, labelled: usize) -> usize {
        match self {
            Layout::Paired => labelled + 1,
            Layout::Flat => labelled,
        }
    }
}

/// Header and body cells after empty rows and columns are dropped
struct Table {
    header: Vec<String>,
    layout: Layout,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn read<R: Read>(reader: R) -> Result<Self, DecodeError> {
        // Header cells keep their spacing until labels are rejoined
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut raw = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            if record.iter().any(|cell| !cell.trim().is_empty()) {
                raw.push(record.iter().map(str::to_string).collect::<Vec<_>>());
            }
        }

        let mut lines = raw.into_iter();
        let header = lines
            .next()
            .ok_or_else(|| DecodeError::format("file contains no header"))?;
        let body: Vec<Vec<String>> = lines
            .map(|row| row.iter().map(|cell| cell.trim().to_string()).collect())
            .collect();

        let layout = Layout::detect(&header);
        let header = join_labels(header, layout);

        let width = body.iter().map(Vec::len).max().unwrap_or(0);
        let header_width = header
            .iter()
            .rposition(|cell| !cell.is_empty())
            .map_or(0, |last| last + 1);
        if !body.is_empty() && header_width > width {
            return Err(DecodeError::format(format!(
                "header spans {header_width} columns but data rows have at most {width}"
            )));
        }

        let kept: Vec<usize> = (0..width)
            .filter(|&col| body.iter().any(|row| !cell(row, col).is_empty()))
            .collect();
        trace!("Keeping {} of {} columns", kept.len(), width);

        let project = |row: &[String]| -> Vec<String> {
            kept.iter().map(|&col| cell(row, col).to_string()).collect()
        };
        Ok(Self {
            header: project(&header),
            layout,
            rows: body.iter().map(|row| project(row)).collect(),
        })
    }

    /// Rows from the first numeric leading cell up to the next non-numeric one
    fn data_rows(&self) -> &[Vec<String>] {
        let is_data = |row: &Vec<String>| parse_number(cell(row, 0)).is_some();
        let Some(start) = self.rows.iter().position(is_data) else {
            return &[];
        };
        let len = self.rows[start..]
            .iter()
            .take_while(|row| is_data(row))
            .count();
        &self.rows[start..start + len]
    }
}

impl FluorescenceDecoder {
    /// Decode an export already opened as a reader; one record per sample,
    /// in order of first appearance in the header
    pub fn decode_reader<R: Read>(
        &self,
        reader: R,
        provenance: &Provenance,
    ) -> Result<Vec<CanonicalRecord>, DecodeError> {
        let table = Table::read(reader)?;

        let samples = sample_names(&table.header);
        if samples.is_empty() {
            return Err(DecodeError::format(format!(
                "no column label contains '{EXCITATION_MARKER}'"
            )));
        }

        let layout = table.layout;

        let data = table.data_rows();
        if data.is_empty() {
            return Err(DecodeError::format("no numeric data rows"));
        }
        debug!(
            "{:?} layout with {} samples and {} emission points",
            layout,
            samples.len(),
            data.len()
        );

        let emission: Vec<f64> = data
            .iter()
            .map(|row| parse_number(cell(row, 0)).map(f64::trunc).unwrap_or(f64::NAN))
            .collect();

        let columns: Vec<(&String, Vec<usize>)> = samples
            .iter()
            .map(|name| {
                let labelled = table
                    .header
                    .iter()
                    .enumerate()
                    .filter(|(_, label)| sample_prefix(label) == Some(name.as_str()))
                    .map(|(index, _)| index)
                    .collect();
                (name, labelled)
            })
            .collect();

        // The first sample defines the excitation axis for all of them
        let excitation: Vec<f64> = columns[0]
            .1
            .iter()
            .map(|&index| excitation_wavelength(&table.header[index]))
            .collect::<Result<_, _>>()?;

        let mut records = Vec::with_capacity(samples.len());
        for (name, labelled) in &columns {
            if labelled.len() != excitation.len() {
                return Err(DecodeError::format(format!(
                    "sample '{name}' has {} excitation scans, expected {}",
                    labelled.len(),
                    excitation.len()
                )));
            }

            let matrix = labelled
                .iter()
                .map(|&index| {
                    let column = layout.intensity_column(index);
                    if column >= table.header.len() {
                        return Err(DecodeError::format(format!(
                            "missing intensity column for '{}'",
                            table.header[index]
                        )));
                    }
                    data.iter()
                        .map(|row| parse_intensity(cell(row, column)))
                        .collect::<Result<Vec<f64>, _>>()
                })
                .collect::<Result<Vec<Vec<f64>>, _>>()?;

            let mut signal_metadata = SignalMetadata::new();
            signal_metadata.insert(axes::EXCITATION.to_string(), excitation.clone());
            signal_metadata.insert(axes::EMISSION.to_string(), emission.clone());

            let mut record = CanonicalRecord::new(
                Self::INSTRUMENT,
                provenance.measurement_date,
                provenance.filename.clone(),
                signal_metadata,
                Payload::Matrix(matrix),
            )?;
            record.amend(MetadataUpdate::new().sample_name(name.as_str()))?;
            records.push(record);
        }

        Ok(records)
    }
}

fn is_label(cell: &str) -> bool {
    cell.contains(EXCITATION_MARKER)
}

/// Rejoin sample names that contain unquoted commas.
///
/// Non-empty unlabelled cells directly before a label are the leading
/// parts of its name. In the flat layout the first cell is the emission
/// column and never part of a name.
fn join_labels(cells: Vec<String>, layout: Layout) -> Vec<String> {
    let first_joinable = match layout {
        Layout::Paired => 0,
        Layout::Flat => 1,
    };
    let mut joined: Vec<String> = Vec::with_capacity(cells.len());

    for cell in cells {
        if is_label(&cell) {
            let mut start = joined.len();
            while start > first_joinable
                && !joined[start - 1].trim().is_empty()
                && !is_label(&joined[start - 1])
            {
                start -= 1;
            }
            let mut parts = joined.split_off(start);
            parts.push(cell);
            joined.push(parts.join(","));
        } else {
            joined.push(cell);
        }
    }

    joined.iter().map(|cell| cell.trim().to_string()).collect()
}

/// Distinct sample names in order of first appearance
fn sample_names(header: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for label in header {
        if let Some(prefix) = sample_prefix(label) {
            if !names.iter().any(|known| known == prefix) {
                names.push(prefix.to_string());
            }
        }
    }
    names
}

/// Text before the first excitation marker
fn sample_prefix(label: &str) -> Option<&str> {
    label.split_once(EXCITATION_MARKER).map(|(prefix, _)| prefix)
}

/// Integer part of the wavelength after the excitation marker
fn excitation_wavelength(label: &str) -> Result<f64, DecodeError> {
    let suffix = label
        .split_once(EXCITATION_MARKER)
        .map(|(_, suffix)| suffix)
        .unwrap_or_default();
    let integer = suffix.split('.').next().unwrap_or_default();
    integer
        .trim()
        .parse::<i64>()
        .map(|value| value as f64)
        .map_err(|_| DecodeError::format(format!("invalid excitation wavelength in '{label}'")))
}

fn parse_intensity(text: &str) -> Result<f64, DecodeError> {
    if text.is_empty() {
        return Ok(f64::NAN);
    }
    parse_number(text).ok_or_else(|| DecodeError::format(format!("non-numeric intensity '{text}'")))
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}
