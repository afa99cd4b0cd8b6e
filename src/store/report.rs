use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

#[cfg(feature = "colorized_output")]
use console::style;

use super::ConflictError;
use crate::record::{Instrument, Payload, SignalMetadata};

/// Options for [`Store::add_with_options`](super::Store::add_with_options)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    /// Make the rows durable before returning. When `false` the rows stay
    /// in a pending transaction until [`Store::commit`](super::Store::commit)
    /// or [`Store::rollback`](super::Store::rollback).
    pub commit: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self { commit: true }
    }
}

/// What [`Store::remove`](super::Store::remove) does with unknown ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Unknown ids are no-ops and listed in [`RemoveReport::missing`]
    #[default]
    Ignore,
    /// Any unknown id fails the whole call and nothing is deleted
    Strict,
}

/// A record persisted by an add call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedRecord {
    /// Position of the record in the submitted batch
    pub index: usize,
    /// Identifier assigned by the store
    pub sample_id: String,
}

/// A record that was not submitted because it already had an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position of the record in the submitted batch
    pub index: usize,
    /// Identifier the record already carried
    pub sample_id: String,
}

/// Outcome of one add call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Persisted records in batch order
    pub inserted: Vec<InsertedRecord>,
    /// Records rejected as duplicates
    pub conflicts: Vec<ConflictError>,
    /// Records skipped because they were already persisted
    pub skipped: Vec<SkippedRecord>,
}

impl AddReport {
    /// Identifiers assigned by this call, in batch order
    pub fn sample_ids(&self) -> Vec<&str> {
        self.inserted.iter().map(|r| r.sample_id.as_str()).collect()
    }

    /// Whether every submitted record was persisted
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.skipped.is_empty()
    }

    /// Fold another report into this one, shifting its batch indices
    pub fn merge(&mut self, other: AddReport, offset: usize) {
        self.inserted.extend(other.inserted.into_iter().map(|mut r| {
            r.index += offset;
            r
        }));
        self.conflicts.extend(other.conflicts.into_iter().map(|mut c| {
            c.index += offset;
            c
        }));
        self.skipped.extend(other.skipped.into_iter().map(|mut s| {
            s.index += offset;
            s
        }));
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static SKIP: Emoji<'_, '_> = Emoji("⚠", "[SKIP]");
            static DUP: Emoji<'_, '_> = Emoji("✗", "[DUP]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Ingest Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=============").cyan()));

            for record in &self.inserted {
                output.push_str(&format!(
                    "[{}] #{} stored as {}\n",
                    OK,
                    record.index,
                    style(&record.sample_id).green()
                ));
            }
            for record in &self.skipped {
                output.push_str(&format!(
                    "[{}] #{} already stored as {}\n",
                    SKIP,
                    record.index,
                    style(&record.sample_id).yellow()
                ));
            }
            for conflict in &self.conflicts {
                output.push_str(&format!("[{}] {}\n", DUP, style(conflict).red()));
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} stored, {} skipped, {} duplicates\n",
                style("Summary").bold(),
                style(self.inserted.len()).green(),
                style(self.skipped.len()).yellow(),
                style(self.conflicts.len()).red()
            ));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for AddReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ingest Report")?;
        writeln!(f, "=============")?;
        for record in &self.inserted {
            writeln!(f, "[✓] #{} stored as {}", record.index, record.sample_id)?;
        }
        for record in &self.skipped {
            writeln!(f, "[⚠] #{} already stored as {}", record.index, record.sample_id)?;
        }
        for conflict in &self.conflicts {
            writeln!(f, "[✗] {}", conflict)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} stored, {} skipped, {} duplicates",
            self.inserted.len(),
            self.skipped.len(),
            self.conflicts.len()
        )
    }
}

/// Outcome of one remove call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    /// Identifiers whose rows were deleted
    pub removed: Vec<String>,
    /// Identifiers that matched no row
    pub missing: Vec<String>,
}

impl fmt::Display for RemoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Removed {} measurement(s)", self.removed.len())?;
        if !self.missing.is_empty() {
            write!(f, "; not found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

/// A row read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMeasurement {
    /// Row primary key
    pub measurement_id: i64,
    /// Assigned identifier (`<instrument code>_<n>`)
    pub sample_id: Option<String>,
    /// Producing instrument
    pub instrument: Instrument,
    /// Calendar date of the source file
    pub measurement_date: NaiveDate,
    /// Sample name
    pub sample_name: Option<String>,
    /// Internal sample code
    pub internal_code: Option<String>,
    /// Collector
    pub collected_by: Option<String>,
    /// Comments
    pub comments: Option<String>,
    /// Measured signal
    pub payload: Payload,
    /// Signal axes
    pub signal_metadata: SignalMetadata,
    /// When the row was inserted (local time)
    pub date_added: NaiveDateTime,
}
