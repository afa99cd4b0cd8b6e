//! Per-instrument sample identifier allocation.
//!
//! Each instrument owns a monotonically increasing counter row. Identifiers
//! are `<instrument code>_<counter>` and are never reused: deleting a
//! measurement leaves its counter untouched. All functions run on the
//! connection of the caller's open transaction.

use rusqlite::{params, Connection, OptionalExtension};

use super::schema::TableNames;
use super::StoreError;
use crate::record::Instrument;

/// Create the counter row at zero if the instrument has none yet
pub(crate) fn ensure_counter(
    connection: &Connection,
    names: &TableNames,
    instrument: Instrument,
) -> Result<(), StoreError> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (instrument_type, counter) VALUES (?1, 0)",
        names.counters
    );
    connection.prepare_cached(&sql)?.execute(params![instrument.code()])?;
    Ok(())
}

/// Increment the counter and return the new value
pub(crate) fn next_value(
    connection: &Connection,
    names: &TableNames,
    instrument: Instrument,
) -> Result<u64, StoreError> {
    let sql = format!(
        "UPDATE {} SET counter = counter + 1 WHERE instrument_type = ?1 RETURNING counter",
        names.counters
    );
    let value: i64 = connection
        .prepare_cached(&sql)?
        .query_row(params![instrument.code()], |row| row.get(0))?;
    counter_value(value)
}

/// Current counter value, zero when the instrument was never used
pub(crate) fn current_value(
    connection: &Connection,
    names: &TableNames,
    instrument: Instrument,
) -> Result<u64, StoreError> {
    let sql = format!(
        "SELECT counter FROM {} WHERE instrument_type = ?1",
        names.counters
    );
    let value: Option<i64> = connection
        .prepare_cached(&sql)?
        .query_row(params![instrument.code()], |row| row.get(0))
        .optional()?;
    counter_value(value.unwrap_or(0))
}

/// Identifier for the `ordinal`-th measurement of an instrument
pub fn format_sample_id(instrument: Instrument, ordinal: u64) -> String {
    format!("{}_{}", instrument.code(), ordinal)
}

fn counter_value(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::CorruptRow(format!("negative sample counter {value}")))
}
