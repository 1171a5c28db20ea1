//! Field pair comparison
//!
//! Blank policy: null and the empty string are the same value. Two blank
//! sides are equal; a blank side against a non-blank side is a mismatch.
//! Non-blank values compare as exact strings, without trimming or case
//! folding.

use crate::config::FieldPair;
use crate::dataset::Record;
use serde::Serialize;

/// One detected inequality between the two sides of a pair on one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub field: String,
    pub original: Option<String>,
    pub forced: Option<String>,
}

/// Collapse null and empty string into `None`
pub fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Compare one pair on one record.
///
/// Returns `None` when the values agree or when the record lacks either
/// column of the pair.
pub fn compare_pair(record: &Record, pair: &FieldPair) -> Option<Mismatch> {
    let original = normalize(record.field(&pair.original)?);
    let forced = normalize(record.field(&pair.forced)?);

    if original == forced {
        return None;
    }

    Some(Mismatch {
        field: pair.label().to_string(),
        original: original.map(str::to_string),
        forced: forced.map(str::to_string),
    })
}

/// All mismatching pairs of a record, in pair declaration order
pub fn compare(record: &Record, pairs: &[FieldPair]) -> Vec<Mismatch> {
    pairs
        .iter()
        .filter_map(|pair| compare_pair(record, pair))
        .collect()
}
