//! Integration tests for SpectraDB
//!
//! These tests run the full pipeline from instrument files on disk through
//! the store to the tabular export.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use parquet::file::reader::{FileReader, SerializedFileReader};
use spectradb::prelude::*;
use spectradb::schema::KEY_SOURCE_TABLE;
use spectradb::store::{format_sample_id, JournalMode};
use tempfile::{tempdir, TempDir};

const PLATE_EXPORT: &str = "\
A1_EX_250.00,,A1_EX_260.00,,B1_EX_250.00,,B1_EX_260.00,,
Wavelength (nm),Data,Wavelength (nm),Data,Wavelength (nm),Data,Wavelength (nm),Data,
300.0,5.0,300.0,6.0,300.0,7.0,300.0,8.0,
305.5,5.1,305.5,6.1,305.5,7.1,305.5,8.1,
";

const NMR_EXPORT: &str = "\
Olive oil 1H
1, 5000, 555, 16.4
2, 5500, 555, 16.3
3, 5250, 555, 16.2
";

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Minimal `.spa` image: sentinel at the scan start, payload right after the header
fn spa_image(values: &[f32], min: f32, max: f32) -> Vec<u8> {
    let payload_offset: u16 = 600;
    let mut bytes = vec![0u8; payload_offset as usize + values.len() * 4];
    bytes[288..290].copy_from_slice(&3u16.to_le_bytes());
    bytes[290..292].copy_from_slice(&payload_offset.to_le_bytes());
    bytes[564..568].copy_from_slice(&(values.len() as i32).to_le_bytes());
    bytes[576..580].copy_from_slice(&max.to_le_bytes());
    bytes[580..584].copy_from_slice(&min.to_le_bytes());
    for (i, value) in values.iter().enumerate() {
        let at = payload_offset as usize + i * 4;
        bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn file_store(path: &Path) -> Store {
    let store = Store::new(StoreConfig::new(path)).unwrap();
    store.open().unwrap();
    store
}

/// Decode every kind of file and store the samples together
#[test]
fn test_decode_and_store_mixed_files() {
    let dir = tempdir().unwrap();
    let files = vec![
        write_file(&dir, "plate.csv", PLATE_EXPORT.as_bytes()),
        write_file(&dir, "oil.txt", NMR_EXPORT.as_bytes()),
        write_file(&dir, "film.spa", &spa_image(&[0.1, 0.2, 0.3, 0.4], 400.0, 4000.0)),
    ];

    let decoded: Vec<SampleSet> = decode_many(&files)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(decoded.iter().map(SampleSet::len).collect::<Vec<_>>(), [2, 1, 1]);

    let plate = &decoded[0];
    let a1 = plate.get(SampleKey::new(1)).unwrap();
    assert_eq!(a1.sample_name(), Some("A1"));
    assert_eq!(a1.axis(axes::EXCITATION).unwrap(), &[250.0, 260.0]);
    assert_eq!(a1.axis(axes::EMISSION).unwrap(), &[300.0, 305.0]);
    assert_eq!(
        a1.payload(),
        &Payload::Matrix(vec![vec![5.0, 5.1], vec![6.0, 6.1]])
    );

    let ftir = decoded[2].get(SampleKey::new(1)).unwrap();
    assert_eq!(ftir.axis(axes::WAVENUMBERS).unwrap(), &[4000.0, 2800.0, 1600.0, 400.0]);

    let store = file_store(&dir.path().join("lab.sqlite"));
    let mut ids = Vec::new();
    for mut samples in decoded {
        samples
            .amend_all(&MetadataUpdate::new().collected_by("jdoe"))
            .unwrap();
        let report = store.add(samples.records_mut()).unwrap();
        assert!(report.is_clean());
        ids.extend(report.sample_ids().into_iter().map(str::to_string));
    }
    assert_eq!(ids, ["INS_3_1", "INS_3_2", "INS_2_1", "INS_1_1"]);

    let rows = store.snapshot().unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.collected_by.as_deref() == Some("jdoe")));
    store.close().unwrap();
}

/// Re-ingesting the same file reports every sample as a duplicate
#[test]
fn test_reingest_reports_duplicates() {
    let dir = tempdir().unwrap();
    let plate = write_file(&dir, "plate.csv", PLATE_EXPORT.as_bytes());
    let store = file_store(&dir.path().join("lab.sqlite"));

    let mut first = decode_path(&plate).unwrap();
    store.add(first.records_mut()).unwrap();

    let mut second = decode_path(&plate).unwrap();
    let report = store.add(second.records_mut()).unwrap();
    assert!(report.inserted.is_empty());
    assert_eq!(report.conflicts.len(), 2);
    assert_eq!(report.conflicts[1].sample_name.as_deref(), Some("B1"));

    // A distinguishing annotation makes the measurement new again
    let mut third = decode_path(&plate).unwrap();
    third
        .amend(SampleKey::new(1), MetadataUpdate::new().comments("repeat"))
        .unwrap();
    third.remove(SampleKey::new(2)).unwrap();
    let report = store.add(third.records_mut()).unwrap();
    assert_eq!(report.sample_ids(), ["INS_3_3"]);
}

/// Counters and rows survive closing and reopening the database
#[test]
fn test_reopen_keeps_counters() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("lab.sqlite");
    let oil = write_file(&dir, "oil.txt", NMR_EXPORT.as_bytes());

    {
        let store = file_store(&db);
        let mut samples = decode_path(&oil).unwrap();
        store.add(samples.records_mut()).unwrap();
        store.remove(&["INS_2_1"], MissingPolicy::Strict).unwrap();
        store.close().unwrap();
    }

    let store = file_store(&db);
    assert_eq!(store.len().unwrap(), 0);
    assert_eq!(store.counter(Instrument::Nmr).unwrap(), 1);

    let mut samples = decode_path(&oil).unwrap();
    let report = store.add(samples.records_mut()).unwrap();
    assert_eq!(report.sample_ids(), ["INS_2_2"]);
}

/// An uncommitted batch is discarded when the store is closed
#[test]
fn test_close_discards_pending_transaction() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("lab.sqlite");
    let oil = write_file(&dir, "oil.txt", NMR_EXPORT.as_bytes());

    {
        let store = file_store(&db);
        let mut samples = decode_path(&oil).unwrap();
        store
            .add_with_options(samples.records_mut(), AddOptions { commit: false })
            .unwrap();
        store.close().unwrap();
    }

    let store = file_store(&db);
    assert!(store.is_empty().unwrap());
    assert_eq!(store.counter(Instrument::Nmr).unwrap(), 0);
}

/// Concurrent writers sharing one store never receive the same identifier
#[test]
fn test_concurrent_adds_get_distinct_ids() {
    let dir = tempdir().unwrap();
    let config =
        StoreConfig::new(dir.path().join("lab.sqlite")).with_journal_mode(JournalMode::Wal);
    let store = Arc::new(Store::new(config).unwrap());
    store.open().unwrap();

    let oil = write_file(&dir, "oil.txt", NMR_EXPORT.as_bytes());
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            let oil = oil.clone();
            thread::spawn(move || {
                let mut ids = Vec::new();
                for round in 0..5 {
                    let mut samples = decode_path(&oil).unwrap();
                    let code = format!("W{worker}-R{round}");
                    samples
                        .amend_all(&MetadataUpdate::new().internal_code(code))
                        .unwrap();
                    let report = store.add(samples.records_mut()).unwrap();
                    ids.extend(report.sample_ids().into_iter().map(str::to_string));
                }
                ids
            })
        })
        .collect();

    let mut ids: Vec<String> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(store.counter(Instrument::Nmr).unwrap(), 20);
    assert!(ids.contains(&format_sample_id(Instrument::Nmr, 20)));
}

/// Export the table to Parquet and CSV
#[test]
fn test_export_snapshot() {
    let dir = tempdir().unwrap();
    let plate = write_file(&dir, "plate.csv", PLATE_EXPORT.as_bytes());
    let store = file_store(&dir.path().join("lab.sqlite"));
    let mut samples = decode_path(&plate).unwrap();
    store.add(samples.records_mut()).unwrap();
    let rows = store.snapshot().unwrap();

    let parquet_path = dir.path().join("export.parquet");
    let config =
        MeasurementWriterConfig::default().with_footer_entry(KEY_SOURCE_TABLE, "Measurements");
    let mut writer = MeasurementWriter::new_file(&parquet_path, config).unwrap();
    writer.write_rows(&rows).unwrap();
    let stats = writer.finish().unwrap();
    assert_eq!(stats.measurements_written, 2);

    let reader = SerializedFileReader::new(File::open(&parquet_path).unwrap()).unwrap();
    assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
    let footer = reader
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .cloned()
        .unwrap_or_default();
    assert!(footer.iter().any(|kv| kv.key == KEY_SOURCE_TABLE));

    let batch = project(&rows).unwrap();
    let mut csv = Vec::new();
    write_csv(&batch, &mut csv).unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("INS_3_2"));
}
