//! Flat, sorted list of every mismatch in the filtered dataset

use crate::compare::{compare, Mismatch};
use crate::config::FieldPair;
use crate::dataset::Dataset;
use crate::error::SchemaWarning;
use serde::Serialize;
use std::cmp::Ordering;

/// Column names of the delimited export, after the identifier column
pub const DIFF_COLUMNS: [&str; 3] = ["field", "original_value", "forced_value"];

/// One mismatch tagged with the identifier of the record it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEntry {
    pub id: Option<String>,
    pub field: String,
    pub original_value: Option<String>,
    pub forced_value: Option<String>,
}

impl DiffEntry {
    fn from_mismatch(id: Option<&str>, mismatch: Mismatch) -> Self {
        Self {
            id: id.map(str::to_string),
            field: mismatch.field,
            original_value: mismatch.original,
            forced_value: mismatch.forced,
        }
    }

    /// Cells in export order; blank values render as empty strings
    pub fn cells(&self) -> [&str; 4] {
        [
            self.id.as_deref().unwrap_or_default(),
            &self.field,
            self.original_value.as_deref().unwrap_or_default(),
            self.forced_value.as_deref().unwrap_or_default(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffTable {
    pub identifier_column: String,
    pub entries: Vec<DiffEntry>,
    /// False when the identifier column was absent and ordering is input order
    pub sorted: bool,
    pub warnings: Vec<SchemaWarning>,
}

impl DiffTable {
    /// Run the comparator over every record and pair, then stable-sort by identifier.
    ///
    /// Entries are produced record by record in input order, pairs in
    /// declaration order, so equal identifiers keep that order. Null
    /// identifiers sort last. If the dataset has no identifier column the
    /// entries stay unsorted and a warning is attached.
    pub fn build(records: &Dataset, pairs: &[FieldPair], identifier_column: &str) -> Self {
        let mut entries: Vec<DiffEntry> = records
            .records()
            .iter()
            .flat_map(|record| {
                compare(record, pairs)
                    .into_iter()
                    .map(move |mismatch| DiffEntry::from_mismatch(record.id.as_deref(), mismatch))
            })
            .collect();

        let mut warnings = Vec::new();
        let sorted = records.has_column(identifier_column);
        if sorted {
            entries.sort_by(|a, b| compare_ids(a.id.as_deref(), b.id.as_deref()));
        } else {
            warnings.push(SchemaWarning::MissingIdentifierColumn {
                column: identifier_column.to_string(),
            });
        }

        Self {
            identifier_column: identifier_column.to_string(),
            entries,
            sorted,
            warnings,
        }
    }

    pub fn headers(&self) -> [&str; 4] {
        [
            self.identifier_column.as_str(),
            DIFF_COLUMNS[0],
            DIFF_COLUMNS[1],
            DIFF_COLUMNS[2],
        ]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries per pair label, in first-seen order
    pub fn counts_by_field(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for entry in &self.entries {
            match counts.iter_mut().find(|(field, _)| *field == entry.field) {
                Some((_, count)) => *count += 1,
                None => counts.push((entry.field.clone(), 1)),
            }
        }
        counts
    }
}

fn compare_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
