#![no_main]

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use spectradb::formats::{FtirDecoder, Provenance};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let provenance = Provenance {
        filename: "fuzz.spa".to_string(),
        measurement_date: NaiveDate::default(),
    };

    // Malformed images must come back as errors, never as panics
    if let Ok(record) = FtirDecoder.decode_reader(Cursor::new(data), &provenance) {
        assert!(record.validate_dimensions().is_ok());
    }
});
