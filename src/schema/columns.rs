/// Column names of the tabular measurement projection
/// Store primary key (absent for records not read from the store)
pub const MEASUREMENT_ID: &str = "measurement_id";
/// Store-assigned sample identifier
pub const SAMPLE_ID: &str = "sample_id";
/// Instrument code (`INS_1` .. `INS_4`)
pub const INSTRUMENT_ID: &str = "instrument_id";
/// Date of the source file
pub const MEASUREMENT_DATE: &str = "measurement_date";
/// Base name of the source file
pub const FILENAME: &str = "filename";
/// Sample name
pub const SAMPLE_NAME: &str = "sample_name";
/// Internal sample code
pub const INTERNAL_CODE: &str = "internal_code";
/// Who collected the sample
pub const COLLECTED_BY: &str = "collected_by";
/// Free-text comments
pub const COMMENTS: &str = "comments";
/// Payload as JSON
pub const DATA: &str = "data";
/// Signal axes as JSON
pub const SIGNAL_METADATA: &str = "signal_metadata";
/// Insertion time
pub const DATE_ADDED: &str = "date_added";

/// Every column in projection order
pub const ALL: [&str; 12] = [
    MEASUREMENT_ID,
    SAMPLE_ID,
    INSTRUMENT_ID,
    MEASUREMENT_DATE,
    FILENAME,
    SAMPLE_NAME,
    INTERNAL_CODE,
    COLLECTED_BY,
    COMMENTS,
    DATA,
    SIGNAL_METADATA,
    DATE_ADDED,
];
