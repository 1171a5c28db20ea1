//! Full-width grid of the filtered records with mismatch cells marked
//!
//! The grid is pure data. Rendering (fills, table regions) happens in
//! [`crate::export`].

use crate::compare::{compare_pair, normalize};
use crate::config::FieldPair;
use crate::dataset::Dataset;
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Characters added to the longest value of a column
pub const COLUMN_PADDING: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    /// Original-value cell of a mismatching pair
    Original,
    /// Forced-value cell of a mismatching pair
    Forced,
}

/// Zero-based data cell coordinate; row 0 is the first record, not the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

impl CellRef {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    /// Longest value (header included) in characters, plus padding
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Option<String>>>,
    pub highlights: BTreeMap<CellRef, Highlight>,
}

impl AnnotatedTable {
    /// Lay out `records` as identifier + pair columns and mark mismatches.
    ///
    /// Column order is the identifier followed by each pair's original and
    /// forced column in declaration order, keeping only columns that exist.
    /// A mismatch marks the forced cell, and the original cell too when
    /// `highlight_original` is set.
    pub fn build(
        records: &Dataset,
        pairs: &[FieldPair],
        identifier_column: &str,
        highlight_original: bool,
    ) -> Self {
        let present = |column: &str| {
            records.has_column(column)
                || records
                    .records()
                    .iter()
                    .any(|record| record.field(column).is_some())
        };

        let has_identifier = records.has_column(identifier_column)
            || records.records().iter().any(|record| record.id.is_some());

        let mut names: IndexSet<String> = IndexSet::new();
        if has_identifier {
            names.insert(identifier_column.to_string());
        }
        for pair in pairs {
            for column in [&pair.original, &pair.forced] {
                if present(column.as_str()) {
                    names.insert(column.clone());
                }
            }
        }
        let value_offset = usize::from(has_identifier);

        let mut rows = Vec::with_capacity(records.len());
        let mut highlights = BTreeMap::new();

        for (row_index, record) in records.records().iter().enumerate() {
            let mut row: Vec<Option<String>> = Vec::with_capacity(names.len());
            if has_identifier {
                row.push(record.id.clone());
            }
            for name in names.iter().skip(value_offset) {
                let value = record.field(name).flatten();
                row.push(normalize(value).map(str::to_string));
            }
            rows.push(row);

            for pair in pairs {
                if compare_pair(record, pair).is_none() {
                    continue;
                }
                if let Some(column) = names.get_index_of(&pair.forced) {
                    mark(&mut highlights, CellRef::new(row_index, column), Highlight::Forced);
                }
                if highlight_original {
                    if let Some(column) = names.get_index_of(&pair.original) {
                        mark(&mut highlights, CellRef::new(row_index, column), Highlight::Original);
                    }
                }
            }
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let longest = rows
                    .iter()
                    .filter_map(|row| row[index].as_deref())
                    .map(|value| value.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or_default();
                Column {
                    name,
                    width: longest + COLUMN_PADDING,
                }
            })
            .collect();

        Self {
            columns,
            rows,
            highlights,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn highlight(&self, row: usize, column: usize) -> Option<Highlight> {
        self.highlights.get(&CellRef::new(row, column)).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// A forced marker wins over an original marker on the same cell
fn mark(highlights: &mut BTreeMap<CellRef, Highlight>, cell: CellRef, highlight: Highlight) {
    highlights
        .entry(cell)
        .and_modify(|existing| *existing = (*existing).max(highlight))
        .or_insert(highlight);
}
