//! Table layout of the canonical store.

/// `date_added` column format (local time)
pub const DATE_ADDED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `measurement_date` column format
pub const MEASUREMENT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Names of every object the store creates, derived from the table name.
///
/// The table name is validated as a plain identifier before this is built,
/// so the names can be spliced into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableNames {
    pub measurements: String,
    pub counters: String,
    sample_id_index: String,
    duplicate_index: String,
}

impl TableNames {
    pub fn new(table_name: &str) -> Self {
        Self {
            measurements: table_name.to_string(),
            counters: format!("{table_name}_instrument_sample_count"),
            sample_id_index: format!("{table_name}_sample_id"),
            duplicate_index: format!("{table_name}_unique_sample"),
        }
    }

    /// Unique index that defines duplicate measurements
    pub fn duplicate_index(&self) -> &str {
        &self.duplicate_index
    }

    /// Idempotent DDL for the measurement and counter tables.
    ///
    /// Duplicates are measurements of the same instrument sharing sample
    /// name, internal code and comments. Unset annotations are mapped to an
    /// empty blob, which equals another unset value but never a text value,
    /// so an unset field and an empty string stay distinct.
    pub fn create_statements(&self) -> String {
        let Self {
            measurements,
            counters,
            sample_id_index,
            duplicate_index,
        } = self;
        format!(
            "CREATE TABLE IF NOT EXISTS {measurements} (
                measurement_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                sample_id        TEXT,
                instrument_id    TEXT NOT NULL,
                measurement_date TEXT NOT NULL,
                sample_name      TEXT,
                internal_code    TEXT,
                collected_by     TEXT,
                comments         TEXT,
                data             TEXT NOT NULL,
                signal_metadata  TEXT NOT NULL,
                date_added       TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {sample_id_index}
                ON {measurements} (sample_id);
            CREATE UNIQUE INDEX IF NOT EXISTS {duplicate_index}
                ON {measurements} (
                    instrument_id,
                    IFNULL(sample_name, X''),
                    IFNULL(internal_code, X''),
                    IFNULL(comments, X'')
                );
            CREATE TABLE IF NOT EXISTS {counters} (
                instrument_type TEXT PRIMARY KEY,
                counter         INTEGER NOT NULL DEFAULT 0
            );"
        )
    }

    pub fn insert_measurement(&self) -> String {
        format!(
            "INSERT INTO {} (
                sample_id, instrument_id, measurement_date, sample_name, internal_code,
                collected_by, comments, data, signal_metadata, date_added
             ) VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            self.measurements
        )
    }

    pub fn stamp_sample_id(&self) -> String {
        format!(
            "UPDATE {} SET sample_id = ?1 WHERE measurement_id = ?2",
            self.measurements
        )
    }

    pub fn delete_by_sample_id(&self) -> String {
        format!("DELETE FROM {} WHERE sample_id = ?1", self.measurements)
    }

    pub fn count_rows(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.measurements)
    }

    pub fn select_all(&self) -> String {
        format!(
            "SELECT measurement_id, sample_id, instrument_id, measurement_date, sample_name,
                    internal_code, collected_by, comments, data, signal_metadata, date_added
             FROM {} ORDER BY measurement_id",
            self.measurements
        )
    }
}
