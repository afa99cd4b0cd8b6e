//! # Canonical Store
//!
//! SQLite persistence for [`CanonicalRecord`]s.
//!
//! Each added record is written in its own atomic unit that inserts the row,
//! increments the per-instrument counter and stamps the resulting
//! `sample_id` (`INS_1_1`, `INS_1_2`, ...). A record duplicating an existing
//! measurement is rolled back on its own and reported as a
//! [`ConflictError`]; the rest of the batch proceeds.
//!
//! ## Lifecycle
//!
//! A [`Store`] starts closed. [`Store::open`] connects and creates the
//! schema, [`Store::close`] releases the connection. Every other operation
//! on a closed store fails with [`StoreError::UsageError`].
//!
//! ```rust,no_run
//! use spectradb::formats::decode_path;
//! use spectradb::store::{Store, StoreConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new(StoreConfig::new("lab.sqlite"))?;
//! store.open()?;
//!
//! let mut samples = decode_path(Path::new("plate.csv"))?;
//! let report = store.add(samples.records_mut())?;
//! println!("{report}");
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The store is `Send + Sync`. The connection sits behind a mutex and every
//! unit runs as `BEGIN IMMEDIATE`, so concurrent adds from several threads
//! never hand out the same identifier.

mod allocator;
mod config;
mod error;
mod report;
mod schema;


use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::record::{CanonicalRecord, Instrument, Payload, SignalMetadata};

pub use allocator::format_sample_id;
pub use config::{JournalMode, StoreConfig, DEFAULT_TABLE_NAME};
pub use error::{ConflictError, StoreError};
pub use report::{
    AddOptions, AddReport, InsertedRecord, MissingPolicy, RemoveReport, SkippedRecord,
    StoredMeasurement,
};
pub use schema::{DATE_ADDED_FORMAT, MEASUREMENT_DATE_FORMAT};

use schema::TableNames;

/// Connection state guarded by the store mutex
#[derive(Debug, Default)]
struct StoreState {
    connection: Option<Connection>,
    /// An outer transaction opened by a non-committing add is in progress
    pending: bool,
}

/// SQLite-backed canonical measurement store
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    names: TableNames,
    state: Mutex<StoreState>,
}

impl Store {
    /// Create a closed store. Fails if the configuration is invalid.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let names = TableNames::new(&config.table_name);
        Ok(Self {
            config,
            names,
            state: Mutex::new(StoreState::default()),
        })
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Connect, apply pragmas and create missing tables
    pub fn open(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.connection.is_some() {
            return Err(StoreError::usage("store is already open"));
        }

        let mut connection = Connection::open(&self.config.path)?;
        apply_pragmas(&connection, &self.config)?;

        let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(&self.names.create_statements())?;
        tx.commit()?;

        info!(
            "Opened store {} (table {})",
            self.config.path.display(),
            self.names.measurements
        );
        state.connection = Some(connection);
        state.pending = false;
        Ok(())
    }

    /// Release the connection. Closing a closed store is a no-op.
    ///
    /// A pending transaction is rolled back.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let Some(connection) = state.connection.take() else {
            return Ok(());
        };
        if std::mem::take(&mut state.pending) {
            warn!("Closing store with uncommitted measurements; rolling back");
            connection.execute_batch("ROLLBACK")?;
        }
        connection.close().map_err(|(_, err)| StoreError::StorageError(err))?;
        info!("Closed store {}", self.config.path.display());
        Ok(())
    }

    /// Whether [`Store::open`] has been called without a matching close
    pub fn is_open(&self) -> bool {
        self.lock().map(|state| state.connection.is_some()).unwrap_or(false)
    }

    /// Whether a non-committing add left a transaction open
    pub fn has_pending(&self) -> bool {
        self.lock().map(|state| state.pending).unwrap_or(false)
    }

    /// Persist records, committing each one as it is written.
    ///
    /// See [`Store::add_with_options`].
    pub fn add<'a>(
        &self,
        records: impl IntoIterator<Item = &'a mut CanonicalRecord>,
    ) -> Result<AddReport, StoreError> {
        self.add_with_options(records, AddOptions::default())
    }

    /// Persist records one atomic unit at a time.
    ///
    /// Persisted records get their `sample_id` stamped in place. Duplicates
    /// end up in [`AddReport::conflicts`] and records that already carry an
    /// identifier in [`AddReport::skipped`]; neither stops the batch. Any
    /// other failure aborts the call; units finished before it stay
    /// persisted.
    ///
    /// With `commit: false` the units run as savepoints of an outer
    /// transaction that stays open across calls. With `commit: true` any
    /// such pending transaction is committed together with this batch.
    ///
    /// Records stamped inside a transaction that is later rolled back keep
    /// their now meaningless identifier and must be discarded.
    pub fn add_with_options<'a>(
        &self,
        records: impl IntoIterator<Item = &'a mut CanonicalRecord>,
        options: AddOptions,
    ) -> Result<AddReport, StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let connection = state.connection.as_mut().ok_or_else(StoreError::closed)?;

        if !options.commit && !state.pending {
            connection.execute_batch("BEGIN IMMEDIATE")?;
            state.pending = true;
            debug!("Started pending transaction");
        }

        let date_added = Local::now().format(DATE_ADDED_FORMAT).to_string();
        let mut report = AddReport::default();

        for (index, record) in records.into_iter().enumerate() {
            if let Some(sample_id) = record.sample_id() {
                warn!("Record {index} is already stored as {sample_id}; skipping");
                report.skipped.push(SkippedRecord {
                    index,
                    sample_id: sample_id.to_string(),
                });
                continue;
            }

            let row = RowValues::from_record(record, &date_added)?;
            let outcome = run_unit(connection, state.pending, |unit| {
                insert_measurement(unit, &self.names, &row)
            });

            match outcome {
                Ok(sample_id) => {
                    debug!("Stored record {index} as {sample_id}");
                    record.assign_sample_id(sample_id.clone());
                    report.inserted.push(InsertedRecord { index, sample_id });
                }
                Err(err) if err.is_unique_violation_of(self.names.duplicate_index()) => {
                    let conflict = ConflictError {
                        index,
                        instrument: record.instrument(),
                        sample_name: record.sample_name().map(str::to_string),
                        internal_code: record.internal_code().map(str::to_string),
                        comments: record.comments().map(str::to_string),
                    };
                    warn!("{conflict}");
                    report.conflicts.push(conflict);
                }
                Err(err) => return Err(err),
            }
        }

        if options.commit && state.pending {
            connection.execute_batch("COMMIT")?;
            state.pending = false;
            debug!("Committed pending transaction");
        }

        info!(
            "Stored {} measurement(s), {} duplicate(s), {} skipped",
            report.inserted.len(),
            report.conflicts.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Make the rows of non-committing adds durable
    pub fn commit(&self) -> Result<(), StoreError> {
        self.finish_pending("COMMIT")
    }

    /// Discard the rows of non-committing adds, including their counter
    /// increments
    pub fn rollback(&self) -> Result<(), StoreError> {
        self.finish_pending("ROLLBACK")
    }

    fn finish_pending(&self, statement: &str) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let connection = state.connection.as_ref().ok_or_else(StoreError::closed)?;
        if !state.pending {
            return Err(StoreError::usage("no pending transaction"));
        }
        connection.execute_batch(statement)?;
        state.pending = false;
        info!("{statement} of pending measurements");
        Ok(())
    }

    /// Delete rows by sample identifier in a single atomic unit.
    ///
    /// Counters are never decremented, so removed identifiers are not
    /// handed out again.
    pub fn remove<S: AsRef<str>>(
        &self,
        sample_ids: &[S],
        policy: MissingPolicy,
    ) -> Result<RemoveReport, StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let connection = state.connection.as_mut().ok_or_else(StoreError::closed)?;

        let mut unique: Vec<&str> = Vec::with_capacity(sample_ids.len());
        for id in sample_ids {
            if !unique.contains(&id.as_ref()) {
                unique.push(id.as_ref());
            }
        }

        let report = run_unit(connection, state.pending, |unit| {
            let mut report = RemoveReport::default();
            let mut delete = unit.prepare_cached(&self.names.delete_by_sample_id())?;
            for id in &unique {
                if delete.execute(params![id])? == 0 {
                    report.missing.push(id.to_string());
                } else {
                    report.removed.push(id.to_string());
                }
            }
            if policy == MissingPolicy::Strict && !report.missing.is_empty() {
                return Err(StoreError::usage(format!(
                    "unknown sample id(s): {}",
                    report.missing.join(", ")
                )));
            }
            Ok(report)
        })?;

        info!("{report}");
        Ok(report)
    }

    /// Number of stored rows
    pub fn len(&self) -> Result<usize, StoreError> {
        let guard = self.lock()?;
        let connection = guard.connection.as_ref().ok_or_else(StoreError::closed)?;
        let count: i64 = connection.query_row(&self.names.count_rows(), [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StoreError::CorruptRow(format!("row count {count}")))
    }

    /// Whether the store holds no rows
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Current allocator value for an instrument (zero if never used)
    pub fn counter(&self, instrument: Instrument) -> Result<u64, StoreError> {
        let guard = self.lock()?;
        let connection = guard.connection.as_ref().ok_or_else(StoreError::closed)?;
        allocator::current_value(connection, &self.names, instrument)
    }

    /// Every row ordered by insertion
    pub fn snapshot(&self) -> Result<Vec<StoredMeasurement>, StoreError> {
        let guard = self.lock()?;
        let connection = guard.connection.as_ref().ok_or_else(StoreError::closed)?;
        let mut statement = connection.prepare(&self.names.select_all())?;
        let rows = statement
            .query_map([], RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_measurement).collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close store cleanly: {e}");
        }
    }
}

fn apply_pragmas(connection: &Connection, config: &StoreConfig) -> Result<(), StoreError> {
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    let mode: String = connection.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.pragma_value(),
        |row| row.get(0),
    )?;
    debug!("journal_mode = {mode}");
    if config.exclusive {
        let locking: String = connection.pragma_update_and_check(
            None,
            "locking_mode",
            "EXCLUSIVE",
            |row| row.get(0),
        )?;
        debug!("locking_mode = {locking}");
    }
    Ok(())
}

/// Run `work` atomically: as a savepoint inside the pending transaction, or
/// as its own `BEGIN IMMEDIATE` transaction. Any error rolls the unit back.
fn run_unit<T>(
    connection: &mut Connection,
    pending: bool,
    work: impl FnOnce(&Connection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    if pending {
        let savepoint = connection.savepoint()?;
        let value = work(&savepoint)?;
        savepoint.commit()?;
        Ok(value)
    } else {
        let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = work(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Insert one row, allocate its identifier and stamp it
fn insert_measurement(
    connection: &Connection,
    names: &TableNames,
    row: &RowValues<'_>,
) -> Result<String, StoreError> {
    allocator::ensure_counter(connection, names, row.instrument)?;

    connection.prepare_cached(&names.insert_measurement())?.execute(params![
        row.instrument.code(),
        row.measurement_date,
        row.sample_name,
        row.internal_code,
        row.collected_by,
        row.comments,
        row.data,
        row.signal_metadata,
        row.date_added,
    ])?;
    let measurement_id = connection.last_insert_rowid();

    let ordinal = allocator::next_value(connection, names, row.instrument)?;
    let sample_id = format_sample_id(row.instrument, ordinal);
    connection
        .prepare_cached(&names.stamp_sample_id())?
        .execute(params![sample_id, measurement_id])?;
    Ok(sample_id)
}

/// Column values of a record about to be inserted
struct RowValues<'a> {
    instrument: Instrument,
    measurement_date: String,
    sample_name: Option<&'a str>,
    internal_code: Option<&'a str>,
    collected_by: Option<&'a str>,
    comments: Option<&'a str>,
    data: String,
    signal_metadata: String,
    date_added: &'a str,
}

impl<'a> RowValues<'a> {
    fn from_record(record: &'a CanonicalRecord, date_added: &'a str) -> Result<Self, StoreError> {
        Ok(Self {
            instrument: record.instrument(),
            measurement_date: record
                .measurement_date()
                .format(MEASUREMENT_DATE_FORMAT)
                .to_string(),
            sample_name: record.sample_name(),
            internal_code: record.internal_code(),
            collected_by: record.collected_by(),
            comments: record.comments(),
            data: record.payload().to_json()?,
            signal_metadata: serde_json::to_string(record.signal_metadata())?,
            date_added,
        })
    }
}

/// A row as SQLite returns it, before any parsing
struct RawRow {
    measurement_id: i64,
    sample_id: Option<String>,
    instrument_id: String,
    measurement_date: String,
    sample_name: Option<String>,
    internal_code: Option<String>,
    collected_by: Option<String>,
    comments: Option<String>,
    data: String,
    signal_metadata: String,
    date_added: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            measurement_id: row.get(0)?,
            sample_id: row.get(1)?,
            instrument_id: row.get(2)?,
            measurement_date: row.get(3)?,
            sample_name: row.get(4)?,
            internal_code: row.get(5)?,
            collected_by: row.get(6)?,
            comments: row.get(7)?,
            data: row.get(8)?,
            signal_metadata: row.get(9)?,
            date_added: row.get(10)?,
        })
    }

    fn into_measurement(self) -> Result<StoredMeasurement, StoreError> {
        let id = self.measurement_id;
        let corrupt = |what: &str, detail: String| {
            StoreError::CorruptRow(format!("measurement {id}: {what}: {detail}"))
        };

        let instrument = Instrument::from_code(&self.instrument_id)
            .map_err(|e| corrupt("instrument_id", e.to_string()))?;
        let measurement_date =
            NaiveDate::parse_from_str(&self.measurement_date, MEASUREMENT_DATE_FORMAT)
                .map_err(|e| corrupt("measurement_date", e.to_string()))?;
        let date_added = NaiveDateTime::parse_from_str(&self.date_added, DATE_ADDED_FORMAT)
            .map_err(|e| corrupt("date_added", e.to_string()))?;
        let payload =
            Payload::from_json(&self.data).map_err(|e| corrupt("data", e.to_string()))?;
        let signal_metadata = parse_signal_metadata(&self.signal_metadata)
            .map_err(|e| corrupt("signal_metadata", e.to_string()))?;

        Ok(StoredMeasurement {
            measurement_id: id,
            sample_id: self.sample_id,
            instrument,
            measurement_date,
            sample_name: self.sample_name,
            internal_code: self.internal_code,
            collected_by: self.collected_by,
            comments: self.comments,
            payload,
            signal_metadata,
            date_added,
        })
    }
}

/// Axes were written with non-finite values as `null`
fn parse_signal_metadata(json: &str) -> Result<SignalMetadata, serde_json::Error> {
    let raw: std::collections::BTreeMap<String, Vec<Option<f64>>> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|(label, values)| {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            (label, values)
        })
        .collect())
}
