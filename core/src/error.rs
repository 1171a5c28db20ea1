//! Error types for forcediff

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for forcediff operations
pub type Result<T> = std::result::Result<T, ForceDiffError>;

/// Fatal errors that abort a reconciliation run.
///
/// Non-fatal schema problems are not errors; they are reported as
/// [`SchemaWarning`] alongside a successful report.
#[derive(Error, Debug)]
pub enum ForceDiffError {
    /// Input could not be decoded: unparseable timestamp, ragged rows,
    /// missing required columns and similar shape problems.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Invalid settings, including a timezone convention that does not
    /// match the timestamps in the data.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl ForceDiffError {
    pub fn malformed_input<S: Into<String>>(msg: S) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Short machine-readable category, used by the CLI's JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::Configuration(_) => "configuration",
            Self::Io(_) => "io",
            Self::Csv(_) => "csv",
            Self::Xlsx(_) => "xlsx",
        }
    }
}

/// Non-fatal schema problem. Processing continues with the columns that exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaWarning {
    /// The identifier column is absent; the diff table is left unsorted
    MissingIdentifierColumn { column: String },
    /// One side of a configured pair is absent; the pair is skipped
    MissingPairColumn { pair: String, column: String },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentifierColumn { column } => {
                write!(f, "identifier column '{column}' is missing; diff rows are not sorted")
            }
            Self::MissingPairColumn { pair, column } => {
                write!(f, "column '{column}' is missing; pair '{pair}' is skipped")
            }
        }
    }
}
