//! # Tabular Projection
//!
//! Pure conversion of records into an Arrow [`RecordBatch`] following
//! [`create_measurement_schema`](crate::schema::create_measurement_schema).
//! Nothing is cached: callers project whatever snapshot they hold and
//! project again after it changes.
//!
//! ```rust,no_run
//! use spectradb::projection::{project, write_csv};
//! use spectradb::store::{Store, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new(StoreConfig::new("lab.sqlite"))?;
//! store.open()?;
//! let batch = project(&store.snapshot()?)?;
//! write_csv(&batch, std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Builder, Int64Builder, StringBuilder, TimestampSecondBuilder,
};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};

use crate::record::{CanonicalRecord, Instrument, Payload, SignalMetadata};
use crate::schema::create_measurement_schema_arc;
use crate::store::StoredMeasurement;

/// Errors that can occur while projecting or exporting records
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    /// Building or writing Arrow data failed
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Payload or axes could not be serialized
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A value that can be laid out as one row of the measurement table
pub trait TabularRow {
    /// Store primary key
    fn measurement_id(&self) -> Option<i64>;
    /// Store-assigned identifier
    fn sample_id(&self) -> Option<&str>;
    /// Producing instrument
    fn instrument(&self) -> Instrument;
    /// Date of the source file
    fn measurement_date(&self) -> NaiveDate;
    /// Source file name, when known
    fn filename(&self) -> Option<&str>;
    /// Sample name
    fn sample_name(&self) -> Option<&str>;
    /// Internal sample code
    fn internal_code(&self) -> Option<&str>;
    /// Collector
    fn collected_by(&self) -> Option<&str>;
    /// Comments
    fn comments(&self) -> Option<&str>;
    /// Measured signal
    fn payload(&self) -> &Payload;
    /// Signal axes
    fn signal_metadata(&self) -> &SignalMetadata;
    /// Insertion time, when persisted
    fn date_added(&self) -> Option<NaiveDateTime>;
}

impl TabularRow for CanonicalRecord {
    fn measurement_id(&self) -> Option<i64> {
        None
    }
    fn sample_id(&self) -> Option<&str> {
        CanonicalRecord::sample_id(self)
    }
    fn instrument(&self) -> Instrument {
        CanonicalRecord::instrument(self)
    }
    fn measurement_date(&self) -> NaiveDate {
        CanonicalRecord::measurement_date(self)
    }
    fn filename(&self) -> Option<&str> {
        Some(CanonicalRecord::filename(self))
    }
    fn sample_name(&self) -> Option<&str> {
        CanonicalRecord::sample_name(self)
    }
    fn internal_code(&self) -> Option<&str> {
        CanonicalRecord::internal_code(self)
    }
    fn collected_by(&self) -> Option<&str> {
        CanonicalRecord::collected_by(self)
    }
    fn comments(&self) -> Option<&str> {
        CanonicalRecord::comments(self)
    }
    fn payload(&self) -> &Payload {
        CanonicalRecord::payload(self)
    }
    fn signal_metadata(&self) -> &SignalMetadata {
        CanonicalRecord::signal_metadata(self)
    }
    fn date_added(&self) -> Option<NaiveDateTime> {
        None
    }
}

impl TabularRow for StoredMeasurement {
    fn measurement_id(&self) -> Option<i64> {
        Some(self.measurement_id)
    }
    fn sample_id(&self) -> Option<&str> {
        self.sample_id.as_deref()
    }
    fn instrument(&self) -> Instrument {
        self.instrument
    }
    fn measurement_date(&self) -> NaiveDate {
        self.measurement_date
    }
    fn filename(&self) -> Option<&str> {
        None
    }
    fn sample_name(&self) -> Option<&str> {
        self.sample_name.as_deref()
    }
    fn internal_code(&self) -> Option<&str> {
        self.internal_code.as_deref()
    }
    fn collected_by(&self) -> Option<&str> {
        self.collected_by.as_deref()
    }
    fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }
    fn payload(&self) -> &Payload {
        &self.payload
    }
    fn signal_metadata(&self) -> &SignalMetadata {
        &self.signal_metadata
    }
    fn date_added(&self) -> Option<NaiveDateTime> {
        Some(self.date_added)
    }
}

/// Lay rows out as one record batch in input order
pub fn project<T: TabularRow>(rows: &[T]) -> Result<RecordBatch, ProjectionError> {
    let n = rows.len();
    let mut measurement_id = Int64Builder::with_capacity(n);
    let mut sample_id = StringBuilder::with_capacity(n, n * 8);
    let mut instrument_id = StringBuilder::with_capacity(n, n * 5);
    let mut measurement_date = Date32Builder::with_capacity(n);
    let mut filename = StringBuilder::new();
    let mut sample_name = StringBuilder::new();
    let mut internal_code = StringBuilder::new();
    let mut collected_by = StringBuilder::new();
    let mut comments = StringBuilder::new();
    let mut data = StringBuilder::new();
    let mut signal_metadata = StringBuilder::new();
    let mut date_added = TimestampSecondBuilder::with_capacity(n);

    for row in rows {
        measurement_id.append_option(row.measurement_id());
        sample_id.append_option(row.sample_id());
        instrument_id.append_value(row.instrument().code());
        measurement_date.append_value(days_since_epoch(row.measurement_date()));
        filename.append_option(row.filename());
        sample_name.append_option(row.sample_name());
        internal_code.append_option(row.internal_code());
        collected_by.append_option(row.collected_by());
        comments.append_option(row.comments());
        data.append_value(row.payload().to_json()?);
        signal_metadata.append_value(serde_json::to_string(row.signal_metadata())?);
        date_added.append_option(row.date_added().map(|t| t.and_utc().timestamp()));
    }

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(measurement_id.finish()),
        Arc::new(sample_id.finish()),
        Arc::new(instrument_id.finish()),
        Arc::new(measurement_date.finish()),
        Arc::new(filename.finish()),
        Arc::new(sample_name.finish()),
        Arc::new(internal_code.finish()),
        Arc::new(collected_by.finish()),
        Arc::new(comments.finish()),
        Arc::new(data.finish()),
        Arc::new(signal_metadata.finish()),
        Arc::new(date_added.finish()),
    ];

    Ok(RecordBatch::try_new(create_measurement_schema_arc(), arrays)?)
}

/// Write a projected batch as CSV with a header row
pub fn write_csv<W: Write>(batch: &RecordBatch, writer: W) -> Result<(), ProjectionError> {
    let mut csv_writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(writer);
    csv_writer.write(batch)?;
    Ok(())
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
    chrono::Datelike::num_days_from_ce(&date) - UNIX_EPOCH_DAYS_FROM_CE
}
