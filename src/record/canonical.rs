use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use super::{Instrument, RecordError};

/// Axis labels used in [`SignalMetadata`]
pub mod axes {
    /// Fluorescence excitation wavelengths (outer payload dimension)
    pub const EXCITATION: &str = "Excitation";
    /// Fluorescence emission wavelengths (inner payload dimension)
    pub const EMISSION: &str = "Emission";
    /// FTIR wavenumbers
    pub const WAVENUMBERS: &str = "Wavenumbers";
    /// NMR chemical shift
    pub const PPM: &str = "ppm";
}

/// Mapping from axis label to the ordered values along that axis
pub type SignalMetadata = BTreeMap<String, Vec<f64>>;

/// Measured signal of one record.
///
/// Non-finite values serialize as JSON `null` and come back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// One intensity per axis point (FTIR, NMR)
    Spectrum(Vec<f64>),
    /// Excitation-major intensity matrix (Fluorescence)
    Matrix(Vec<Vec<f64>>),
}

impl Payload {
    /// Number of values along the outer dimension
    pub fn len(&self) -> usize {
        match self {
            Payload::Spectrum(values) => values.len(),
            Payload::Matrix(rows) => rows.len(),
        }
    }

    /// Whether the payload holds no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize to the JSON text stored in the `data` column
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the JSON text stored in the `data` column.
    ///
    /// An array of arrays is a matrix; anything else must be a flat array.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        use serde::de::Error;

        let value: serde_json::Value = serde_json::from_str(json)?;
        let items = value
            .as_array()
            .ok_or_else(|| serde_json::Error::custom("payload must be a JSON array"))?;

        if items.first().is_some_and(|first| first.is_array()) {
            let rows = items
                .iter()
                .map(|row| {
                    row.as_array()
                        .ok_or_else(|| serde_json::Error::custom("ragged payload matrix"))
                        .and_then(|cells| cells.iter().map(json_number).collect())
                })
                .collect::<Result<Vec<Vec<f64>>, _>>()?;
            Ok(Payload::Matrix(rows))
        } else {
            let values = items.iter().map(json_number).collect::<Result<_, _>>()?;
            Ok(Payload::Spectrum(values))
        }
    }
}

fn json_number(value: &serde_json::Value) -> Result<f64, serde_json::Error> {
    use serde::de::Error;

    match value {
        serde_json::Value::Null => Ok(f64::NAN),
        other => other.as_f64().ok_or_else(|| {
            serde_json::Error::custom(format!("payload value is not a number: {other}"))
        }),
    }
}

/// Metadata amendment applied with [`CanonicalRecord::amend`].
///
/// Fields left as `None` are not touched. `Some(String::new())` sets an
/// intentionally empty value, which is distinct from an unset one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    /// New sample name
    pub sample_name: Option<String>,
    /// New internal sample code
    pub internal_code: Option<String>,
    /// New collector name
    pub collected_by: Option<String>,
    /// New free-text comments
    pub comments: Option<String>,
}

impl MetadataUpdate {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample name
    pub fn sample_name(mut self, value: impl Into<String>) -> Self {
        self.sample_name = Some(value.into());
        self
    }

    /// Set the internal sample code
    pub fn internal_code(mut self, value: impl Into<String>) -> Self {
        self.internal_code = Some(value.into());
        self
    }

    /// Set who collected the sample
    pub fn collected_by(mut self, value: impl Into<String>) -> Self {
        self.collected_by = Some(value.into());
        self
    }

    /// Set the comments
    pub fn comments(mut self, value: impl Into<String>) -> Self {
        self.comments = Some(value.into());
        self
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.sample_name.is_none()
            && self.internal_code.is_none()
            && self.collected_by.is_none()
            && self.comments.is_none()
    }
}

/// Normalized representation of one instrument measurement.
///
/// Produced by the decoders in [`crate::formats`] and consumed by
/// [`crate::store::Store`]. The `sample_id` stays unset until the store
/// persists the record and is immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    instrument: Instrument,
    measurement_date: NaiveDate,
    filename: String,
    sample_name: Option<String>,
    internal_code: Option<String>,
    collected_by: Option<String>,
    comments: Option<String>,
    signal_metadata: SignalMetadata,
    payload: Payload,
    sample_id: Option<String>,
}

impl CanonicalRecord {
    /// Create a record, checking the payload against its axes
    pub fn new(
        instrument: Instrument,
        measurement_date: NaiveDate,
        filename: impl Into<String>,
        signal_metadata: SignalMetadata,
        payload: Payload,
    ) -> Result<Self, RecordError> {
        let record = Self {
            instrument,
            measurement_date,
            filename: filename.into(),
            sample_name: None,
            internal_code: None,
            collected_by: None,
            comments: None,
            signal_metadata,
            payload,
            sample_id: None,
        };
        record.validate_dimensions()?;
        Ok(record)
    }

    /// Instrument that produced the measurement
    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    /// Calendar date of the source file's modification time
    pub fn measurement_date(&self) -> NaiveDate {
        self.measurement_date
    }

    /// Base name of the source file
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Sample name, if set
    pub fn sample_name(&self) -> Option<&str> {
        self.sample_name.as_deref()
    }

    /// Internal sample code, if set
    pub fn internal_code(&self) -> Option<&str> {
        self.internal_code.as_deref()
    }

    /// Who collected the sample, if set
    pub fn collected_by(&self) -> Option<&str> {
        self.collected_by.as_deref()
    }

    /// Free-text comments, if set
    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Axis label → axis values
    pub fn signal_metadata(&self) -> &SignalMetadata {
        &self.signal_metadata
    }

    /// Values along one axis
    pub fn axis(&self, label: &str) -> Option<&[f64]> {
        self.signal_metadata.get(label).map(Vec::as_slice)
    }

    /// Measured signal
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Store-assigned identifier, present once persisted
    pub fn sample_id(&self) -> Option<&str> {
        self.sample_id.as_deref()
    }

    /// Whether the store has assigned an identifier
    pub fn is_persisted(&self) -> bool {
        self.sample_id.is_some()
    }

    /// Apply a metadata amendment. Only allowed before persistence.
    pub fn amend(&mut self, update: MetadataUpdate) -> Result<(), RecordError> {
        if let Some(sample_id) = &self.sample_id {
            return Err(RecordError::AlreadyPersisted(sample_id.clone()));
        }
        let MetadataUpdate {
            sample_name,
            internal_code,
            collected_by,
            comments,
        } = update;
        if sample_name.is_some() {
            self.sample_name = sample_name;
        }
        if internal_code.is_some() {
            self.internal_code = internal_code;
        }
        if collected_by.is_some() {
            self.collected_by = collected_by;
        }
        if comments.is_some() {
            self.comments = comments;
        }
        Ok(())
    }

    /// Stamp the store-assigned identifier. The first assignment wins.
    pub(crate) fn assign_sample_id(&mut self, sample_id: String) {
        if self.sample_id.is_none() {
            self.sample_id = Some(sample_id);
        }
    }

    /// Check that the payload dimensions agree with the signal axes.
    ///
    /// A matrix needs `Excitation` rows of `Emission` values each; a flat
    /// spectrum must be as long as every axis it carries.
    pub fn validate_dimensions(&self) -> Result<(), RecordError> {
        match &self.payload {
            Payload::Matrix(rows) => {
                let excitation = self.axis(axes::EXCITATION).unwrap_or_default();
                let emission = self.axis(axes::EMISSION).unwrap_or_default();
                self.check_axis(axes::EXCITATION, excitation.len(), rows.len())?;
                for row in rows {
                    self.check_axis(axes::EMISSION, emission.len(), row.len())?;
                }
            }
            Payload::Spectrum(values) => {
                for (label, axis) in &self.signal_metadata {
                    self.check_axis(label, axis.len(), values.len())?;
                }
            }
        }
        Ok(())
    }

    fn check_axis(&self, axis: &str, expected: usize, actual: usize) -> Result<(), RecordError> {
        if expected != actual {
            return Err(RecordError::AxisMismatch {
                instrument: self.instrument,
                axis: axis.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// Base name of a path, lossily converted to UTF-8
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Local calendar date of the file's last modification
pub fn modification_date(path: &Path) -> std::io::Result<NaiveDate> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified).date_naive())
}
