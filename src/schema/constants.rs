/// Export format version - follows semantic versioning
pub const SPECTRADB_FORMAT_VERSION: &str = "1.0.0";

/// Metadata key for format version in Parquet footer
pub const KEY_FORMAT_VERSION: &str = "spectradb:format_version";

/// Metadata key for the export timestamp
pub const KEY_EXPORT_TIMESTAMP: &str = "spectradb:export_timestamp";

/// Metadata key for the store table the rows came from
pub const KEY_SOURCE_TABLE: &str = "spectradb:source_table";

/// Field metadata key describing how a text column is encoded
pub const KEY_ENCODING: &str = "encoding";
