use anyhow::{Context, Result};
use std::path::PathBuf;

use spectradb::formats::{decode_path, DecoderKind};
use spectradb::record::{Instrument, Payload};

/// Display the samples decoded from one file
pub fn run(file: PathBuf, instrument: Option<DecoderKind>) -> Result<()> {
    let samples = match instrument {
        Some(kind) => kind.decode(&file),
        None => decode_path(&file),
    }
    .with_context(|| format!("Failed to decode {}", file.display()))?;

    println!("File: {}", file.display());
    if let Some((_, first)) = samples.iter().next() {
        println!("{}", instrument_line(first.instrument()));
        println!("Measurement date: {}", first.measurement_date());
    }
    println!("Samples: {}", samples.len());
    println!();
    println!("{}", samples);

    for (key, record) in samples.iter() {
        let shape = match record.payload() {
            Payload::Spectrum(values) => format!("{} points", values.len()),
            Payload::Matrix(rows) => format!(
                "{} x {} matrix",
                rows.len(),
                rows.first().map(Vec::len).unwrap_or(0)
            ),
        };
        let axes: Vec<String> = record
            .signal_metadata()
            .iter()
            .map(|(label, values)| format!("{label}[{}]", values.len()))
            .collect();
        println!("{key}: {shape}; axes {}", axes.join(", "));
    }

    Ok(())
}

fn instrument_line(instrument: Instrument) -> String {
    format!("Instrument: {} ({})", instrument.name(), instrument.code())
}
