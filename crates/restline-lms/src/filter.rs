//! Per-dataset record inclusion rules

use crate::dataset::DatasetKind;
use crate::page::Record;

/// Default substring marking internal accounts
pub const DEFAULT_EXCLUDE_SUBSTRING: &str = "onetrust";

/// Drops internal accounts from people datasets; other datasets pass through.
///
/// Matching is a case-insensitive substring test on the dataset's exclusion
/// field. Records lacking the field, or holding a non-string there, are kept.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    needle: String,
}

impl RecordFilter {
    pub fn new(exclude_substring: &str) -> Self {
        Self {
            needle: exclude_substring.to_lowercase(),
        }
    }

    pub fn keeps(&self, kind: DatasetKind, record: &Record) -> bool {
        let Some(field) = kind.exclusion_field() else {
            return true;
        };
        if self.needle.is_empty() {
            return true;
        }
        match record.get(field).and_then(|v| v.as_str()) {
            Some(value) => !value.to_lowercase().contains(&self.needle),
            None => true,
        }
    }

    /// Subset of `records` that passes, in input order
    pub fn apply(&self, kind: DatasetKind, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .filter(|r| self.keeps(kind, r))
            .cloned()
            .collect()
    }
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDE_SUBSTRING)
    }
}
