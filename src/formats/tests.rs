use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::{tempdir, TempDir};

use super::ftir::{layout, linspace, wavenumber_axis};
use super::*;
use crate::record::{axes, Payload, SampleKey};

fn provenance(name: &str) -> Provenance {
    Provenance {
        filename: name.to_string(),
        measurement_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
    }
}

/// Build a minimal `.spa` image with the payload placed at `payload_offset`
fn spa_bytes(values: &[f32], min: f32, max: f32, payload_offset: u16) -> Vec<u8> {
    let mut bytes = vec![0u8; payload_offset as usize + values.len() * 4];
    let put = |bytes: &mut Vec<u8>, at: u64, raw: &[u8]| {
        let at = at as usize;
        bytes[at..at + raw.len()].copy_from_slice(raw);
    };

    // Two unrelated markers before the sentinel
    put(&mut bytes, layout::MARKER_SCAN_OFFSET, &7u16.to_le_bytes());
    put(&mut bytes, layout::MARKER_SCAN_OFFSET + 2, &12u16.to_le_bytes());
    put(&mut bytes, layout::MARKER_SCAN_OFFSET + 4, &layout::PAYLOAD_SENTINEL.to_le_bytes());
    put(&mut bytes, layout::MARKER_SCAN_OFFSET + 6, &payload_offset.to_le_bytes());

    put(&mut bytes, layout::POINT_COUNT_OFFSET, &(values.len() as i32).to_le_bytes());
    put(&mut bytes, layout::AXIS_MAX_OFFSET, &max.to_le_bytes());
    put(&mut bytes, layout::AXIS_MIN_OFFSET, &min.to_le_bytes());

    for (i, value) in values.iter().enumerate() {
        put(&mut bytes, payload_offset as u64 + i as u64 * 4, &value.to_le_bytes());
    }
    bytes
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const CARY_EXPORT: &str = "\
S1_EX_300.00,,S1_EX_310.00,,S2_EX_300.00,,S2_EX_310.00,,
Wavelength (nm),Data,Wavelength (nm),Data,Wavelength (nm),Data,Wavelength (nm),Data,
400.0,1.0,400.0,2.0,400.0,10.0,400.0,20.0,
401.7,1.1,401.7,2.1,401.7,10.1,401.7,20.1,
402.0,1.2,402.0,,402.0,10.2,402.0,20.2,

Scan Software Version,2.0
";

// ---------------------------------------------------------------------------
// FTIR
// ---------------------------------------------------------------------------

#[test]
fn test_ftir_decodes_payload_and_axis() {
    let bytes = spa_bytes(&[0.5, 0.25, 0.125, 1.0], 400.0, 4000.0, 600);
    let record = FtirDecoder
        .decode_reader(Cursor::new(bytes), &provenance("sample.spa"))
        .unwrap();

    assert_eq!(record.instrument(), Instrument::Ftir);
    assert_eq!(record.payload(), &Payload::Spectrum(vec![0.5, 0.25, 0.125, 1.0]));
    assert_eq!(
        record.axis(axes::WAVENUMBERS).unwrap(),
        &[4000.0, 2800.0, 1600.0, 400.0]
    );
    assert_eq!(record.filename(), "sample.spa");
}

#[test]
fn test_wavenumber_axis_truncates_toward_zero() {
    // 400 + 3600/7 * k has fractional parts that must be cut, not rounded
    let axis = wavenumber_axis(400.0, 4000.0, 8);
    assert_eq!(axis.first(), Some(&4000.0));
    assert_eq!(axis.last(), Some(&400.0));
    assert_eq!(axis[1], 3485.0);
    assert!(axis.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_linspace_edges() {
    assert!(linspace(1.0, 2.0, 0).is_empty());
    assert_eq!(linspace(5.0, 9.0, 1), vec![5.0]);
    assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
}

#[test]
fn test_ftir_missing_sentinel_is_format_error() {
    let mut bytes = spa_bytes(&[1.0], 1.0, 2.0, 600);
    // Blank out the sentinel and everything after it
    let start = layout::MARKER_SCAN_OFFSET as usize;
    for b in &mut bytes[start..] {
        *b = 0;
    }
    // Keep the header fields so only the sentinel is missing
    bytes[layout::POINT_COUNT_OFFSET as usize] = 1;
    let err = FtirDecoder
        .decode_reader(Cursor::new(bytes), &provenance("x.spa"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::FormatError(_)), "{err}");
}

#[test]
fn test_ftir_short_payload_is_format_error() {
    let mut bytes = spa_bytes(&[1.0, 2.0, 3.0], 1.0, 2.0, 600);
    bytes.truncate(bytes.len() - 2);
    let err = FtirDecoder
        .decode_reader(Cursor::new(bytes), &provenance("x.spa"))
        .unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_ftir_truncated_header_is_format_error() {
    let err = FtirDecoder
        .decode_reader(Cursor::new(vec![0u8; 100]), &provenance("x.spa"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::FormatError(_)));
}

#[test]
fn test_ftir_negative_count_is_format_error() {
    let mut bytes = spa_bytes(&[1.0], 1.0, 2.0, 600);
    let at = layout::POINT_COUNT_OFFSET as usize;
    bytes[at..at + 4].copy_from_slice(&(-5i32).to_le_bytes());
    let err = FtirDecoder
        .decode_reader(Cursor::new(bytes), &provenance("x.spa"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::FormatError(msg) if msg.contains("negative")));
}

#[test]
fn test_ftir_decode_file_yields_single_sample() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "sample.SPA", &spa_bytes(&[3.0, 4.0], 10.0, 20.0, 640));
    let samples = FtirDecoder.decode(&path).unwrap();
    assert_eq!(samples.len(), 1);
    let record = samples.get(SampleKey::new(1)).unwrap();
    assert_eq!(record.filename(), "sample.SPA");
    assert_eq!(record.axis(axes::WAVENUMBERS).unwrap(), &[20.0, 10.0]);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_validate_rejects_wrong_extension_without_reading() {
    // The file does not exist, so any read attempt would surface as IoError
    let missing = Path::new("/definitely/not/here/example.wtf");
    for kind in DecoderKind::ALL {
        let err = kind.decode(missing).unwrap_err();
        assert!(matches!(err, DecodeError::ValidationError { .. }), "{err}");
    }
}

#[test]
fn test_chosen_decoder_rejects_readable_file_with_other_extension() {
    let dir = tempdir().unwrap();
    let points = "1, 5000, 555, 16.4\n2, 5500, 555, 16.3\n";
    let renamed = write_file(&dir, "oil.csv", points.as_bytes());

    let err = DecoderKind::Nmr.decode(&renamed).unwrap_err();
    assert!(
        matches!(err, DecodeError::ValidationError { expected: "txt", .. }),
        "{err}"
    );

    let original = write_file(&dir, "oil.txt", points.as_bytes());
    assert_eq!(DecoderKind::Nmr.decode(&original).unwrap().len(), 1);
    assert!(matches!(
        DecoderKind::Fluorescence.decode(&original),
        Err(DecodeError::ValidationError { expected: "csv", .. })
    ));
}

#[test]
fn test_decoder_kind_selection() {
    assert_eq!(DecoderKind::from_path(Path::new("a.csv")), Some(DecoderKind::Fluorescence));
    assert_eq!(DecoderKind::from_path(Path::new("a.TXT")), Some(DecoderKind::Nmr));
    assert_eq!(DecoderKind::from_path(Path::new("a.spa")), Some(DecoderKind::Ftir));
    assert_eq!(DecoderKind::from_path(Path::new("a.raw")), None);
    assert!(matches!(
        DecoderKind::for_instrument(Instrument::Gc),
        Err(DecodeError::UnsupportedInstrument(Instrument::Gc))
    ));
    assert_eq!(
        DecoderKind::for_instrument(Instrument::Nmr).unwrap().extension(),
        "txt"
    );
}

// ---------------------------------------------------------------------------
// NMR
// ---------------------------------------------------------------------------

#[test]
fn test_nmr_decodes_points() {
    let record = NmrDecoder
        .decode_reader("1,5000,555,16.4\n2,5500,555,16.3".as_bytes(), &provenance("example.txt"))
        .unwrap();
    assert_eq!(record.payload(), &Payload::Spectrum(vec![5000.0, 5500.0]));
    assert_eq!(record.axis(axes::PPM).unwrap(), &[16.4, 16.3]);
    assert_eq!(record.instrument(), Instrument::Nmr);
}

#[test]
fn test_nmr_skips_title_and_whitespace() {
    let record = NmrDecoder
        .decode_reader(
            "Title\n 1, 5000, 555, 16.4\n 2, 5500, 555, 16.3\n".as_bytes(),
            &provenance("example.txt"),
        )
        .unwrap();
    assert_eq!(record.payload(), &Payload::Spectrum(vec![5000.0, 5500.0]));
}

#[test]
fn test_nmr_rejects_short_and_non_numeric_rows() {
    let short = NmrDecoder
        .decode_reader("1,5000,555\n".as_bytes(), &provenance("x.txt"))
        .unwrap_err();
    assert!(short.is_format_error());

    let bad = NmrDecoder
        .decode_reader("1,5000,555,16.4\n2,high,555,16.3\n".as_bytes(), &provenance("x.txt"))
        .unwrap_err();
    assert!(matches!(bad, DecodeError::FormatError(msg) if msg.contains("high")));

    let empty = NmrDecoder
        .decode_reader("Title only\n".as_bytes(), &provenance("x.txt"))
        .unwrap_err();
    assert!(empty.is_format_error());
}

// ---------------------------------------------------------------------------
// Fluorescence
// ---------------------------------------------------------------------------

#[test]
fn test_fluorescence_paired_layout() {
    let records = FluorescenceDecoder
        .decode_reader(CARY_EXPORT.as_bytes(), &provenance("plate.csv"))
        .unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.sample_name(), Some("S1"));
    assert_eq!(first.axis(axes::EXCITATION).unwrap(), &[300.0, 310.0]);
    assert_eq!(first.axis(axes::EMISSION).unwrap(), &[400.0, 401.0, 402.0]);

    let Payload::Matrix(rows) = first.payload() else {
        panic!("expected a matrix payload");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec![1.0, 1.1, 1.2]);
    assert_eq!(&rows[1][..2], &[2.0, 2.1]);
    assert!(rows[1][2].is_nan());

    let second = &records[1];
    assert_eq!(second.sample_name(), Some("S2"));
    assert_eq!(
        second.payload(),
        &Payload::Matrix(vec![vec![10.0, 10.1, 10.2], vec![20.0, 20.1, 20.2]])
    );
}

#[test]
fn test_fluorescence_flat_layout() {
    let csv = "\
Emission,Water_EX_250.5,Water_EX_260,Tea_EX_250,Tea_EX_260
300,1,2,3,4
305,5,6,7,8
";
    let records = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("flat.csv"))
        .unwrap();
    let names: Vec<_> = records.iter().map(|r| r.sample_name().unwrap()).collect();
    assert_eq!(names, ["Water", "Tea"]);
    assert_eq!(records[0].axis(axes::EXCITATION).unwrap(), &[250.0, 260.0]);
    assert_eq!(
        records[1].payload(),
        &Payload::Matrix(vec![vec![3.0, 7.0], vec![4.0, 8.0]])
    );
}

#[test]
fn test_fluorescence_quoted_names_keep_commas() {
    let csv = "\
Emission,\"1,5,7 ABC_EX_300\",\"1,5,7 ABC_EX_310\"
400,1,2
401,3,4
";
    let records = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("comma.csv"))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sample_name(), Some("1,5,7 ABC"));
}

#[test]
fn test_fluorescence_unquoted_comma_names_paired() {
    let csv = CARY_EXPORT.replace("S1", "1,5,7 ABC");
    let records = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("edgecase_FL.csv"))
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.sample_name().unwrap()).collect();
    assert_eq!(names, ["1,5,7 ABC", "S2"]);
    assert_eq!(records[0].axis(axes::EXCITATION).unwrap(), &[300.0, 310.0]);
    assert_eq!(records[0].axis(axes::EMISSION).unwrap(), &[400.0, 401.0, 402.0]);
    let Payload::Matrix(rows) = records[0].payload() else {
        panic!("expected a matrix payload");
    };
    assert_eq!(rows[0], vec![1.0, 1.1, 1.2]);
    assert_eq!(
        records[1].payload(),
        &Payload::Matrix(vec![vec![10.0, 10.1, 10.2], vec![20.0, 20.1, 20.2]])
    );
}

#[test]
fn test_fluorescence_unquoted_comma_names_flat() {
    let csv = "\
Emission,1,5,7 ABC_EX_300,1,5,7 ABC_EX_310,Oil, batch 2_EX_300,Oil, batch 2_EX_310
400,1,2,5,6
401,3,4,7,8
";
    let records = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("flat.csv"))
        .unwrap();
    let names: Vec<_> = records.iter().map(|r| r.sample_name().unwrap()).collect();
    assert_eq!(names, ["1,5,7 ABC", "Oil, batch 2"]);
    assert_eq!(
        records[0].payload(),
        &Payload::Matrix(vec![vec![1.0, 3.0], vec![2.0, 4.0]])
    );
    assert_eq!(
        records[1].payload(),
        &Payload::Matrix(vec![vec![5.0, 7.0], vec![6.0, 8.0]])
    );
}

#[test]
fn test_fluorescence_header_wider_than_data_is_rejected() {
    let csv = "\
Emission,A_EX_300,B_EX_300,C_EX_300
400,1,2
";
    let err = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("wide.csv"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::FormatError(msg) if msg.contains("header spans 4")));
}

#[test]
fn test_fluorescence_prefix_match_is_exact() {
    // "BA" contains "A_EX_" as a substring but is a different sample
    let csv = "\
Emission,A_EX_300,BA_EX_300
400,1,2
";
    let records = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("prefix.csv"))
        .unwrap();
    assert_eq!(records[0].payload(), &Payload::Matrix(vec![vec![1.0]]));
    assert_eq!(records[1].payload(), &Payload::Matrix(vec![vec![2.0]]));
}

#[test]
fn test_fluorescence_uneven_scans_are_rejected() {
    let csv = "\
Emission,A_EX_300,A_EX_310,B_EX_300
400,1,2,3
";
    let err = FluorescenceDecoder
        .decode_reader(csv.as_bytes(), &provenance("uneven.csv"))
        .unwrap_err();
    assert!(matches!(err, DecodeError::FormatError(msg) if msg.contains("'B'")));
}

#[test]
fn test_fluorescence_without_marker_is_rejected() {
    let err = FluorescenceDecoder
        .decode_reader("a,b\n1,2\n".as_bytes(), &provenance("plain.csv"))
        .unwrap_err();
    assert!(err.is_format_error());
}

#[test]
fn test_fluorescence_decode_is_deterministic() {
    let dir = tempdir().unwrap();
    let path = write_file(&dir, "plate.csv", CARY_EXPORT.as_bytes());
    let first = FluorescenceDecoder.decode(&path).unwrap();
    let second = FluorescenceDecoder.decode(&path).unwrap();

    let names = |set: &SampleSet| -> Vec<(String, Option<String>)> {
        set.iter()
            .map(|(key, r)| (key.to_string(), r.sample_name().map(str::to_string)))
            .collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.len(), 2);

    // NaN cells never compare equal, so compare the serialized payloads
    for ((_, a), (_, b)) in first.iter().zip(second.iter()) {
        assert_eq!(a.signal_metadata(), b.signal_metadata());
        assert_eq!(a.payload().to_json().unwrap(), b.payload().to_json().unwrap());
    }
    let Some((_, sample)) = first.iter().next() else {
        panic!("expected a sample");
    };
    assert!(sample.payload().to_json().unwrap().contains("null"));
}

#[test]
fn test_decode_many_preserves_order() {
    let dir = tempdir().unwrap();
    let nmr = write_file(&dir, "a.txt", b"1,10,0,1.0\n");
    let bad = write_file(&dir, "b.txt", b"nothing here\n");
    let ftir = write_file(&dir, "c.spa", &spa_bytes(&[1.0], 5.0, 5.0, 600));

    let results = decode_many(&[nmr, bad, ftir]);
    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().unwrap().get(SampleKey::new(1)).unwrap().instrument(),
        Instrument::Nmr
    );
    assert!(results[1].is_err());
    assert_eq!(
        results[2].as_ref().unwrap().get(SampleKey::new(1)).unwrap().instrument(),
        Instrument::Ftir
    );
}
