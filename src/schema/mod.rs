//! # Measurement Projection Schema
//!
//! Apache Arrow schema of the tabular view over canonical records and
//! stored measurements, shared by the CSV and Parquet exports.
//!
//! ## Schema Columns
//!
//! | Column | Type | Nullable | Description |
//! |--------|------|----------|-------------|
//! | measurement_id | Int64 | yes | Store primary key |
//! | sample_id | Utf8 | yes | `<instrument code>_<n>` |
//! | instrument_id | Utf8 | no | `INS_1` .. `INS_4` |
//! | measurement_date | Date32 | no | Date of the source file |
//! | filename | Utf8 | yes | Source file name (not persisted) |
//! | sample_name | Utf8 | yes | Sample name |
//! | internal_code | Utf8 | yes | Internal sample code |
//! | collected_by | Utf8 | yes | Collector |
//! | comments | Utf8 | yes | Free text |
//! | data | Utf8 | no | Payload as JSON |
//! | signal_metadata | Utf8 | no | Axes as JSON |
//! | date_added | Timestamp(s) | yes | Insertion time (local) |

mod builders;
/// Projection column name constants.
pub mod columns;
mod constants;
mod validation;


pub use builders::{create_measurement_schema, create_measurement_schema_arc};
pub use constants::*;
pub use validation::{validate_schema, SchemaValidationError};
