use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RecordError;

/// Instruments whose measurements can be stored.
///
/// Each instrument carries a stable code that prefixes the sample
/// identifiers allocated by the store (`INS_3_12` is the twelfth
/// fluorescence sample). The codes are part of the on-disk format and must
/// never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    /// Fourier-transform infrared spectrometer
    #[serde(rename = "INS_1")]
    Ftir,
    /// Nuclear magnetic resonance spectrometer
    #[serde(rename = "INS_2")]
    Nmr,
    /// Fluorescence spectrometer (excitation/emission matrices)
    #[serde(rename = "INS_3")]
    Fluorescence,
    /// Gas chromatograph; code reserved, no decoder yet
    #[serde(rename = "INS_4")]
    Gc,
}

impl Instrument {
    /// All instruments, in code order
    pub const ALL: [Instrument; 4] = [
        Instrument::Ftir,
        Instrument::Nmr,
        Instrument::Fluorescence,
        Instrument::Gc,
    ];

    /// Stable short code used as the sample identifier prefix
    pub fn code(&self) -> &'static str {
        match self {
            Instrument::Ftir => "INS_1",
            Instrument::Nmr => "INS_2",
            Instrument::Fluorescence => "INS_3",
            Instrument::Gc => "INS_4",
        }
    }

    /// Resolve an instrument from its stored code
    pub fn from_code(code: &str) -> Result<Self, RecordError> {
        Self::ALL
            .into_iter()
            .find(|instrument| instrument.code() == code)
            .ok_or_else(|| RecordError::UnknownInstrument(code.to_string()))
    }

    /// Human-readable instrument name
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Ftir => "FTIR",
            Instrument::Nmr => "NMR",
            Instrument::Fluorescence => "Fluorescence",
            Instrument::Gc => "GC",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = RecordError;

    /// Accepts either the code (`INS_1`) or the name (`ftir`, case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(instrument) = Self::from_code(s) {
            return Ok(instrument);
        }
        Self::ALL
            .into_iter()
            .find(|instrument| instrument.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RecordError::UnknownInstrument(s.to_string()))
    }
}
