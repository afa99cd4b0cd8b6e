use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaBuilder, TimeUnit};

use super::columns;
use super::constants::{KEY_ENCODING, KEY_FORMAT_VERSION, SPECTRADB_FORMAT_VERSION};

/// Text field holding a JSON document
fn json_field(name: &str) -> Field {
    let mut metadata = HashMap::new();
    metadata.insert(KEY_ENCODING.to_string(), "json".to_string());
    Field::new(name, DataType::Utf8, false).with_metadata(metadata)
}

/// Creates the Arrow schema of the tabular measurement projection.
///
/// One row per measurement. Payload and axes are carried as JSON text so
/// that spectra and excitation/emission matrices share one layout.
///
/// # Example
///
/// ```
/// use spectradb::schema::create_measurement_schema;
///
/// let schema = create_measurement_schema();
/// assert_eq!(schema.fields().len(), 12);
/// ```
pub fn create_measurement_schema() -> Schema {
    let mut builder = SchemaBuilder::new();

    // Store identity, absent for records that were never persisted
    builder.push(Field::new(columns::MEASUREMENT_ID, DataType::Int64, true));
    builder.push(Field::new(columns::SAMPLE_ID, DataType::Utf8, true));

    builder.push(Field::new(columns::INSTRUMENT_ID, DataType::Utf8, false));
    builder.push(Field::new(columns::MEASUREMENT_DATE, DataType::Date32, false));
    builder.push(Field::new(columns::FILENAME, DataType::Utf8, true));

    // Annotations; null means unset, "" means intentionally empty
    builder.push(Field::new(columns::SAMPLE_NAME, DataType::Utf8, true));
    builder.push(Field::new(columns::INTERNAL_CODE, DataType::Utf8, true));
    builder.push(Field::new(columns::COLLECTED_BY, DataType::Utf8, true));
    builder.push(Field::new(columns::COMMENTS, DataType::Utf8, true));

    builder.push(json_field(columns::DATA));
    builder.push(json_field(columns::SIGNAL_METADATA));

    builder.push(Field::new(
        columns::DATE_ADDED,
        DataType::Timestamp(TimeUnit::Second, None),
        true,
    ));

    let mut metadata = HashMap::new();
    metadata.insert(
        KEY_FORMAT_VERSION.to_string(),
        SPECTRADB_FORMAT_VERSION.to_string(),
    );
    builder.finish().with_metadata(metadata)
}

/// Returns an Arc-wrapped schema for shared ownership
pub fn create_measurement_schema_arc() -> Arc<Schema> {
    Arc::new(create_measurement_schema())
}
