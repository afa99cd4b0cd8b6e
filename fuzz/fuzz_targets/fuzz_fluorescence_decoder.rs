#![no_main]

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use spectradb::formats::{FluorescenceDecoder, Provenance};

fuzz_target!(|data: &[u8]| {
    let provenance = Provenance {
        filename: "fuzz.csv".to_string(),
        measurement_date: NaiveDate::default(),
    };

    if let Ok(records) = FluorescenceDecoder.decode_reader(data, &provenance) {
        for record in &records {
            assert!(record.validate_dimensions().is_ok());
        }
    }
});
