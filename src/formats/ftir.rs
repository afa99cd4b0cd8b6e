//! FTIR binary decoder.
//!
//! The spectrometer writes a fixed-layout little-endian `.spa` dump. Only a
//! handful of fields matter for the canonical record:
//!
//! ```text
//! offset 288   u16 markers ... 3, <payload offset: u16>
//! offset 564   i32 number of points
//! offset 576   f32 wavenumber maximum
//! offset 580   f32 wavenumber minimum
//! <payload>    f32 × number of points
//! ```
//!
//! The marker region is scanned two bytes at a time until the sentinel
//! value; the word that follows is the absolute byte offset of the
//! intensity block.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use super::{Decoder, DecodeError, Provenance};
use crate::record::{axes, CanonicalRecord, Instrument, Payload, SampleSet, SignalMetadata};

/// Byte offsets and marker values of the `.spa` layout
pub mod layout {
    /// Start of the marker region
    pub const MARKER_SCAN_OFFSET: u64 = 288;
    /// Marker value preceding the payload offset
    pub const PAYLOAD_SENTINEL: u16 = 3;
    /// Number of points (`i32`)
    pub const POINT_COUNT_OFFSET: u64 = 564;
    /// Wavenumber maximum (`f32`); the minimum follows immediately
    pub const AXIS_MAX_OFFSET: u64 = 576;
    /// Wavenumber minimum (`f32`)
    pub const AXIS_MIN_OFFSET: u64 = 580;
}

/// Decoder for FTIR `.spa` files
#[derive(Debug, Clone, Copy, Default)]
pub struct FtirDecoder;

impl Decoder for FtirDecoder {
    const INSTRUMENT: Instrument = Instrument::Ftir;
    const EXTENSION: &'static str = "spa";

    fn decode(&self, path: &Path) -> Result<SampleSet, DecodeError> {
        self.validate(path)?;
        let provenance = Provenance::from_path(path)?;
        let reader = BufReader::new(File::open(path)?);
        let record = self.decode_reader(reader, &provenance)?;
        debug!(
            "Decoded FTIR spectrum from {} ({} points)",
            provenance.filename,
            record.payload().len()
        );
        Ok(SampleSet::from_records([record]))
    }
}

impl FtirDecoder {
    /// Decode an in-memory or already opened `.spa` stream
    pub fn decode_reader<R: Read + Seek>(
        &self,
        mut reader: R,
        provenance: &Provenance,
    ) -> Result<CanonicalRecord, DecodeError> {
        let stream_len = reader.seek(SeekFrom::End(0))?;

        reader.seek(SeekFrom::Start(layout::POINT_COUNT_OFFSET))?;
        let point_count = short_read(reader.read_i32::<LittleEndian>(), "point count")?;
        let point_count = usize::try_from(point_count)
            .map_err(|_| DecodeError::format(format!("negative point count {point_count}")))?;

        reader.seek(SeekFrom::Start(layout::AXIS_MAX_OFFSET))?;
        let axis_max = short_read(reader.read_f32::<LittleEndian>(), "wavenumber maximum")?;
        reader.seek(SeekFrom::Start(layout::AXIS_MIN_OFFSET))?;
        let axis_min = short_read(reader.read_f32::<LittleEndian>(), "wavenumber minimum")?;
        if !axis_max.is_finite() || !axis_min.is_finite() {
            return Err(DecodeError::format(format!(
                "non-finite wavenumber bounds ({axis_min}, {axis_max})"
            )));
        }

        let payload_offset = locate_payload(&mut reader)?;
        let payload_end = payload_offset + (point_count as u64) * 4;
        if payload_end > stream_len {
            return Err(DecodeError::format(format!(
                "payload of {point_count} points at offset {payload_offset} \
                 runs past end of file ({stream_len} bytes)"
            )));
        }

        reader.seek(SeekFrom::Start(payload_offset))?;
        let mut intensities = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            let value = short_read(reader.read_f32::<LittleEndian>(), "payload")?;
            intensities.push(f64::from(value));
        }

        let mut signal_metadata = SignalMetadata::new();
        signal_metadata.insert(
            axes::WAVENUMBERS.to_string(),
            wavenumber_axis(f64::from(axis_min), f64::from(axis_max), point_count),
        );

        Ok(CanonicalRecord::new(
            Self::INSTRUMENT,
            provenance.measurement_date,
            provenance.filename.clone(),
            signal_metadata,
            Payload::Spectrum(intensities),
        )?)
    }
}

/// Scan the marker region for the sentinel and return the payload offset
fn locate_payload<R: Read + Seek>(reader: &mut R) -> Result<u64, DecodeError> {
    reader.seek(SeekFrom::Start(layout::MARKER_SCAN_OFFSET))?;
    loop {
        match reader.read_u16::<LittleEndian>() {
            Ok(layout::PAYLOAD_SENTINEL) => break,
            Ok(_) => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(DecodeError::format("payload sentinel not found before end of file"));
            }
            Err(e) => return Err(e.into()),
        }
    }
    let offset = short_read(reader.read_u16::<LittleEndian>(), "payload offset")?;
    Ok(u64::from(offset))
}

/// Map a truncated read to a format error, keep other I/O failures as they are
fn short_read<T>(result: io::Result<T>, field: &str) -> Result<T, DecodeError> {
    result.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::format(format!("file truncated while reading {field}"))
        } else {
            DecodeError::IoError(e)
        }
    })
}

/// Evenly spaced values from `start` to `stop` inclusive
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Wavenumber axis as reported by the instrument software: descending,
/// truncated toward zero
pub fn wavenumber_axis(min: f64, max: f64, n: usize) -> Vec<f64> {
    linspace(min, max, n).into_iter().rev().map(f64::trunc).collect()
}
