//! In-memory tabular dataset and delimited-text decoding

use crate::config::{ReconcileConfig, TimestampConvention};
use crate::error::{ForceDiffError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A parsed `lastused` value.
///
/// Offset-carrying values are normalised to UTC; values without an offset
/// stay naive. The two kinds are never compared with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyStamp {
    Aware(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl RecencyStamp {
    /// Parse a timestamp cell. Returns `None` for text that is not a timestamp.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(Self::Aware(parsed.with_timezone(&Utc)));
        }
        for format in AWARE_FORMATS {
            if let Ok(parsed) = DateTime::parse_from_str(text, format) {
                return Some(Self::Aware(parsed.with_timezone(&Utc)));
            }
        }

        // "2024-05-01 10:00:00Z" / "2024-05-01 10:00:00 UTC"
        let utc_body = text
            .strip_suffix(" UTC")
            .or_else(|| text.strip_suffix('Z'))
            .or_else(|| text.strip_suffix('z'));
        if let Some(body) = utc_body {
            return parse_naive(body.trim_end())
                .map(|naive| Self::Aware(Utc.from_utc_datetime(&naive)));
        }

        parse_naive(text).map(Self::Naive)
    }

    pub fn convention(&self) -> TimestampConvention {
        match self {
            Self::Aware(_) => TimestampConvention::Utc,
            Self::Naive(_) => TimestampConvention::Naive,
        }
    }
}

impl fmt::Display for RecencyStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aware(ts) => write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Naive(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// One row of input data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: Option<String>,
    pub last_used: Option<RecencyStamp>,
    fields: IndexMap<String, Option<String>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_last_used(mut self, stamp: RecencyStamp) -> Self {
        self.last_used = Some(stamp);
        self
    }

    pub fn with_field(mut self, column: impl Into<String>, value: Option<&str>) -> Self {
        self.set_field(column, value.map(str::to_string));
        self
    }

    pub fn set_field(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.insert(column.into(), value);
    }

    /// Value of a column: `None` when the record has no such column,
    /// `Some(None)` when the column is present but null.
    pub fn field(&self, column: &str) -> Option<Option<&str>> {
        self.fields.get(column).map(|value| value.as_deref())
    }
}

/// A decoded table: the set of columns present plus its records in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: IndexSet<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            records: Vec::new(),
        }
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn columns(&self) -> &IndexSet<String> {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A dataset with the same columns and the given records
    pub(crate) fn with_same_columns(&self, records: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }

    pub fn from_csv_bytes(bytes: &[u8], config: &ReconcileConfig) -> Result<Self> {
        Self::from_csv_reader(bytes, config)
    }

    /// Decode comma-separated text with a header row.
    ///
    /// Only the identifier, the timestamp column and the columns named by
    /// configured pairs are kept. The timestamp column is mandatory; a
    /// non-empty timestamp that cannot be parsed fails the whole decode.
    pub fn from_csv_reader<R: Read>(input: R, config: &ReconcileConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input);

        let headers = reader
            .headers()
            .map_err(|e| ForceDiffError::malformed_input(format!("Cannot read header row: {e}")))?
            .clone();

        let mut seen = HashSet::new();
        for header in headers.iter() {
            if !seen.insert(header) {
                return Err(ForceDiffError::malformed_input(format!(
                    "Duplicate column '{header}' in header row"
                )));
            }
        }

        let position = |name: &str| headers.iter().position(|header| header == name);
        let last_used_column = &config.columns.last_used;
        let last_used_index = position(last_used_column.as_str()).ok_or_else(|| {
            ForceDiffError::malformed_input(format!("Missing required column '{last_used_column}'"))
        })?;
        let id_index = position(config.columns.identifier.as_str());

        let referenced: HashSet<String> = config.referenced_columns().into_iter().collect();
        let field_indices: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter(|(index, header)| {
                *index != last_used_index
                    && Some(*index) != id_index
                    && referenced.contains(*header)
            })
            .collect();

        let columns = headers
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                *index == last_used_index
                    || Some(*index) == id_index
                    || field_indices.iter().any(|(field_index, _)| field_index == index)
            })
            .map(|(_, header)| header.to_string());
        let mut dataset = Dataset::new(columns);

        for (row, result) in reader.records().enumerate() {
            let row_number = row + 1;
            let raw = result.map_err(|e| {
                ForceDiffError::malformed_input(format!("Row {row_number}: {e}"))
            })?;

            let mut record = Record::new();
            record.id = id_index
                .and_then(|index| raw.get(index))
                .filter(|value| !value.is_empty())
                .map(str::to_string);

            let stamp_text = raw.get(last_used_index).unwrap_or_default();
            if !stamp_text.trim().is_empty() {
                let stamp = RecencyStamp::parse(stamp_text).ok_or_else(|| {
                    ForceDiffError::malformed_input(format!(
                        "Row {row_number}: cannot parse {last_used_column} value '{stamp_text}'"
                    ))
                })?;
                record.last_used = Some(stamp);
            }

            for (index, column) in &field_indices {
                let value = raw.get(*index).map(str::to_string);
                record.set_field(*column, value);
            }
            dataset.push(record);
        }

        log::debug!(
            "Decoded {} rows with columns {:?}",
            dataset.len(),
            dataset.columns()
        );
        Ok(dataset)
    }
}
