//! # Measurement Writer Module
//!
//! Writes projected measurements to Parquet. Rows follow
//! [`create_measurement_schema`](crate::schema::create_measurement_schema);
//! the footer carries the export format version, the export time and any
//! caller supplied key-value pairs.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use chrono::Local;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use parquet::schema::types::ColumnPath;

use crate::projection::{project, ProjectionError, TabularRow};
use crate::schema::{
    columns, create_measurement_schema_arc, validate_schema, KEY_EXPORT_TIMESTAMP,
    KEY_FORMAT_VERSION, SPECTRADB_FORMAT_VERSION,
};

/// Errors that can occur during measurement writing
#[derive(Debug, thiserror::Error)]
pub enum MeasurementWriterError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Rows could not be projected
    #[error("Projection error: {0}")]
    ProjectionError(#[from] ProjectionError),

    /// Batch does not follow the measurement schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Configuration for the measurement writer
#[derive(Debug, Clone)]
pub struct MeasurementWriterConfig {
    /// ZSTD compression level
    pub compression_level: i32,

    /// Target row group size
    pub row_group_size: usize,

    /// Data page size in bytes
    pub data_page_size: usize,

    /// Whether to write statistics for columns
    pub write_statistics: bool,

    /// Extra key-value pairs for the Parquet footer
    pub footer_metadata: BTreeMap<String, String>,
}

impl Default for MeasurementWriterConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            row_group_size: 1024, // rows carry whole spectra
            data_page_size: 1024 * 1024,
            write_statistics: true,
            footer_metadata: BTreeMap::new(),
        }
    }
}

impl MeasurementWriterConfig {
    /// Add a footer key-value pair
    pub fn with_footer_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.footer_metadata.insert(key.into(), value.into());
        self
    }

    fn to_writer_properties(&self) -> WriterProperties {
        let compression = Compression::ZSTD(
            ZstdLevel::try_new(self.compression_level).unwrap_or_default(),
        );

        let statistics = if self.write_statistics {
            EnabledStatistics::Chunk
        } else {
            EnabledStatistics::None
        };

        let mut builder = WriterProperties::builder()
            .set_compression(compression)
            .set_data_page_size_limit(self.data_page_size)
            .set_statistics_enabled(statistics)
            .set_max_row_group_size(self.row_group_size);

        // JSON payloads are unique per row; dictionaries only cost space
        for column in [columns::DATA, columns::SIGNAL_METADATA] {
            builder = builder
                .set_column_dictionary_enabled(ColumnPath::new(vec![column.to_string()]), false);
        }

        let mut footer = self.footer_metadata.clone();
        footer.insert(
            KEY_FORMAT_VERSION.to_string(),
            SPECTRADB_FORMAT_VERSION.to_string(),
        );
        footer
            .entry(KEY_EXPORT_TIMESTAMP.to_string())
            .or_insert_with(|| Local::now().to_rfc3339());

        let kv_metadata: Vec<KeyValue> = footer
            .into_iter()
            .map(|(key, value)| KeyValue {
                key,
                value: Some(value),
            })
            .collect();

        builder.set_key_value_metadata(Some(kv_metadata)).build()
    }
}

/// Streaming writer for measurement Parquet files
pub struct MeasurementWriter<W: Write + Send> {
    writer: ArrowWriter<W>,
    schema: Arc<Schema>,
    measurements_written: usize,
    batches_written: usize,
}

impl MeasurementWriter<File> {
    /// Create a new writer to a file path
    pub fn new_file<P: AsRef<Path>>(
        path: P,
        config: MeasurementWriterConfig,
    ) -> Result<Self, MeasurementWriterError> {
        let file = File::create(path)?;
        Self::new(file, config)
    }
}

impl<W: Write + Send> MeasurementWriter<W> {
    /// Create a new writer to any Write implementation
    pub fn new(writer: W, config: MeasurementWriterConfig) -> Result<Self, MeasurementWriterError> {
        let schema = create_measurement_schema_arc();
        let props = config.to_writer_properties();
        let arrow_writer = ArrowWriter::try_new(writer, schema.clone(), Some(props))?;

        Ok(Self {
            writer: arrow_writer,
            schema,
            measurements_written: 0,
            batches_written: 0,
        })
    }

    /// Project and write a group of measurements
    pub fn write_rows<T: TabularRow>(&mut self, rows: &[T]) -> Result<(), MeasurementWriterError> {
        if rows.is_empty() {
            return Ok(());
        }
        let batch = project(rows)?;
        self.write_batch(&batch)
    }

    /// Write an already projected batch
    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), MeasurementWriterError> {
        validate_schema(&batch.schema())
            .map_err(|e| MeasurementWriterError::SchemaMismatch(e.to_string()))?;
        if batch.schema().fields() != self.schema.fields() {
            return Err(MeasurementWriterError::SchemaMismatch(
                "batch was not produced by the measurement projection".to_string(),
            ));
        }
        self.writer.write(batch)?;
        self.measurements_written += batch.num_rows();
        self.batches_written += 1;
        Ok(())
    }

    /// Flush any buffered data and finalize the file
    pub fn finish(self) -> Result<MeasurementWriterStats, MeasurementWriterError> {
        let file_metadata = self.writer.close()?;

        Ok(MeasurementWriterStats {
            measurements_written: self.measurements_written,
            batches_written: self.batches_written,
            row_groups_written: file_metadata.row_groups.len(),
            file_size_bytes: file_metadata
                .row_groups
                .iter()
                .map(|rg| rg.total_byte_size as u64)
                .sum(),
        })
    }

    /// Finalize and return the inner writer (for buffer extraction)
    pub fn finish_into_inner(self) -> Result<W, MeasurementWriterError> {
        let writer = self.writer.into_inner()?;
        Ok(writer)
    }

    /// Get current statistics
    pub fn stats(&self) -> MeasurementWriterStats {
        MeasurementWriterStats {
            measurements_written: self.measurements_written,
            batches_written: self.batches_written,
            row_groups_written: 0, // Unknown until finish
            file_size_bytes: 0,    // Unknown until finish
        }
    }
}

/// Statistics from a completed measurement write
#[derive(Debug, Clone)]
pub struct MeasurementWriterStats {
    /// Rows written
    pub measurements_written: usize,
    /// Batches handed to the writer
    pub batches_written: usize,
    /// Row groups in the finished file
    pub row_groups_written: usize,
    /// Uncompressed size of all row groups
    pub file_size_bytes: u64,
}

impl std::fmt::Display for MeasurementWriterStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Wrote {} measurements in {} row groups",
            self.measurements_written, self.row_groups_written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{axes, CanonicalRecord, Instrument, Payload, SignalMetadata};
    use chrono::NaiveDate;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use std::io::Cursor;

    fn spectrum(points: usize) -> CanonicalRecord {
        let mut signal_metadata = SignalMetadata::new();
        signal_metadata.insert(
            axes::WAVENUMBERS.to_string(),
            (0..points).map(|i| 4000.0 - i as f64).collect(),
        );
        CanonicalRecord::new(
            Instrument::Ftir,
            NaiveDate::from_ymd_opt(2023, 11, 2).unwrap(),
            "scan.spa",
            signal_metadata,
            Payload::Spectrum(vec![0.5; points]),
        )
        .unwrap()
    }

    #[test]
    fn test_write_measurements() -> Result<(), MeasurementWriterError> {
        let config = MeasurementWriterConfig::default()
            .with_footer_entry("spectradb:source_table", "Measurements");
        let mut writer = MeasurementWriter::new(Cursor::new(Vec::new()), config)?;

        writer.write_rows(&[spectrum(3), spectrum(5)])?;
        writer.write_rows::<CanonicalRecord>(&[])?;
        assert_eq!(writer.stats().measurements_written, 2);

        let buffer = writer.finish_into_inner()?.into_inner();
        let reader = SerializedFileReader::new(bytes_of(buffer.clone()))?;
        let footer = reader
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .cloned()
            .unwrap_or_default();
        let lookup = |key: &str| {
            footer
                .iter()
                .find(|kv| kv.key == key)
                .and_then(|kv| kv.value.clone())
        };
        assert_eq!(lookup(KEY_FORMAT_VERSION).as_deref(), Some(SPECTRADB_FORMAT_VERSION));
        assert_eq!(lookup("spectradb:source_table").as_deref(), Some("Measurements"));

        let rows: usize = ParquetRecordBatchReaderBuilder::try_new(bytes_of(buffer))?
            .build()?
            .map(|batch| batch.map(|b| b.num_rows()))
            .sum::<Result<usize, _>>()?;
        assert_eq!(rows, 2);
        Ok(())
    }

    #[test]
    fn test_finish_reports_stats() -> Result<(), MeasurementWriterError> {
        let mut writer =
            MeasurementWriter::new(Cursor::new(Vec::new()), MeasurementWriterConfig::default())?;
        writer.write_rows(&[spectrum(10)])?;
        let stats = writer.finish()?;
        assert_eq!(stats.measurements_written, 1);
        assert_eq!(stats.row_groups_written, 1);
        assert!(stats.to_string().contains("1 measurements"));
        Ok(())
    }

    #[test]
    fn test_rejects_foreign_batch() {
        use arrow::array::Int32Array;
        use arrow::datatypes::{DataType, Field};

        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(vec![1, 2]))]).unwrap();
        let mut writer =
            MeasurementWriter::new(Cursor::new(Vec::new()), MeasurementWriterConfig::default())
                .unwrap();
        let err = writer.write_batch(&batch).unwrap_err();
        assert!(matches!(
            err,
            MeasurementWriterError::SchemaMismatch(msg) if msg.contains("sample_id")
        ));
    }

    fn bytes_of(buffer: Vec<u8>) -> bytes::Bytes {
        bytes::Bytes::from(buffer)
    }
}
