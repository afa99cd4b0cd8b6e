use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{CanonicalRecord, MetadataUpdate, RecordError};

/// Per-file sample identifier (`S1`, `S2`, ...)
///
/// Ordered numerically, so `S10` sorts after `S9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleKey(u32);

impl SampleKey {
    /// Key for the given 1-based ordinal
    pub fn new(ordinal: u32) -> Self {
        Self(ordinal)
    }

    /// 1-based ordinal
    pub fn ordinal(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl FromStr for SampleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('S')
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|ordinal| *ordinal > 0)
            .map(SampleKey)
            .ok_or_else(|| format!("invalid sample identifier '{s}', expected S<n>"))
    }
}

/// Records decoded from one file, keyed by per-file sample identifier.
///
/// Keys are handed out in decode order starting at `S1`. Removing a sample
/// never renumbers the others. Entries change through [`SampleSet::amend`]
/// and [`SampleSet::remove`]. [`SampleSet::records_mut`] exists for the store,
/// which stamps each record with its sample identifier; it never exposes the
/// keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: BTreeMap<SampleKey, CanonicalRecord>,
}

impl SampleSet {
    /// Number the records `S1..Sn` in the given order
    pub fn from_records(records: impl IntoIterator<Item = CanonicalRecord>) -> Self {
        let samples = records
            .into_iter()
            .zip(1u32..)
            .map(|(record, ordinal)| (SampleKey(ordinal), record))
            .collect();
        Self { samples }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample identifiers in order
    pub fn keys(&self) -> impl Iterator<Item = SampleKey> + '_ {
        self.samples.keys().copied()
    }

    /// Look up one sample
    pub fn get(&self, key: SampleKey) -> Option<&CanonicalRecord> {
        self.samples.get(&key)
    }

    /// Iterate `(identifier, record)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (SampleKey, &CanonicalRecord)> {
        self.samples.iter().map(|(key, record)| (*key, record))
    }

    /// Records in identifier order, for handing to the store
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut CanonicalRecord> {
        self.samples.values_mut()
    }

    /// Amend the metadata of one sample
    pub fn amend(&mut self, key: SampleKey, update: MetadataUpdate) -> Result<(), RecordError> {
        self.samples
            .get_mut(&key)
            .ok_or(RecordError::UnknownSample(key))?
            .amend(update)
    }

    /// Amend every sample with the same update
    pub fn amend_all(&mut self, update: &MetadataUpdate) -> Result<(), RecordError> {
        for record in self.samples.values_mut() {
            record.amend(update.clone())?;
        }
        Ok(())
    }

    /// Drop one sample from the set
    pub fn remove(&mut self, key: SampleKey) -> Result<CanonicalRecord, RecordError> {
        self.samples
            .remove(&key)
            .ok_or(RecordError::UnknownSample(key))
    }

    /// Consume the set, yielding records in identifier order
    pub fn into_records(self) -> Vec<CanonicalRecord> {
        self.samples.into_values().collect()
    }
}

impl fmt::Display for SampleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = format!("| {:<10} | {:<45} |", "Identifier", "Sample Name");
        let separator = format!("+{}+", "-".repeat(header.chars().count() - 2));

        writeln!(f, "{separator}")?;
        writeln!(f, "{header}")?;
        writeln!(f, "{separator}")?;
        for (key, record) in &self.samples {
            let name = record.sample_name().unwrap_or("<unset>");
            writeln!(f, "| {:<10} | {:<45} |", key.to_string(), name)?;
        }
        write!(f, "{separator}")
    }
}
