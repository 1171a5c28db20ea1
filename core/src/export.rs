//! Report rendering
//!
//! Turns the in-memory diff table and annotated grid into the two artifact
//! payloads: delimited text via the `csv` crate and a single-sheet XLSX
//! workbook via `rust_xlsxwriter`. Output bytes depend only on the tables
//! and the options, so identical runs produce identical payloads.

use crate::annotated::{AnnotatedTable, Highlight};
use crate::diff_table::DiffTable;
use crate::error::{ForceDiffError, Result};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatPattern, Table, TableColumn, TableStyle,
    Workbook,
};
use serde::Serialize;

/// Fill for the original-value cell of a mismatching pair
pub const ORIGINAL_FILL: u32 = 0xFFFF00;
/// Fill for the forced-value cell of a mismatching pair
pub const FORCED_FILL: u32 = 0xFF9999;

/// Supported artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Delimited text
    Csv,
    /// Microsoft Excel format (XLSX)
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }
}

/// Options for the delimited export
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Whether to write the header row
    pub include_header: bool,
    /// Field delimiter, must be ASCII
    pub delimiter: char,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_header: true,
            delimiter: ',',
        }
    }
}

/// Options for the spreadsheet export
#[derive(Debug, Clone)]
pub struct WorkbookOptions {
    pub sheet_name: String,
    pub table_name: String,
    /// Stored as the document creation time
    pub created: DateTime<Utc>,
}

/// A rendered report payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub format: ExportFormat,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// BLAKE3 hex digest of `bytes`
    pub digest: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>, format: ExportFormat, bytes: Vec<u8>) -> Self {
        let digest = blake3::hash(&bytes).to_hex().to_string();
        Self {
            name: name.into(),
            format,
            bytes,
            digest,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Render the diff table as delimited text with `\n` record terminators
pub fn diff_table_to_csv(table: &DiffTable, options: &ExportOptions) -> Result<Vec<u8>> {
    let delimiter = u8::try_from(options.delimiter).map_err(|_| {
        ForceDiffError::configuration(format!(
            "Delimiter {:?} is not a single-byte character",
            options.delimiter
        ))
    })?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if options.include_header {
        writer.write_record(table.headers())?;
    }
    for entry in &table.entries {
        writer.write_record(entry.cells())?;
    }

    writer
        .into_inner()
        .map_err(|e| ForceDiffError::Io(e.into_error()))
}

/// Render the annotated grid as a single-sheet workbook.
///
/// Row 1 is the header. Highlighted cells get a solid fill, yellow for
/// original values and light red for forced values. Columns are sized from
/// the grid's computed widths. A named table covers the header and data
/// when there is at least one data row.
pub fn annotated_to_xlsx(table: &AnnotatedTable, options: &WorkbookOptions) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let created = ExcelDateTime::from_timestamp(options.created.timestamp())?;
    let properties = DocProperties::new().set_creation_datetime(&created);
    workbook.set_properties(&properties);

    let original_format = Format::new()
        .set_background_color(Color::RGB(ORIGINAL_FILL))
        .set_pattern(FormatPattern::Solid);
    let forced_format = Format::new()
        .set_background_color(Color::RGB(FORCED_FILL))
        .set_pattern(FormatPattern::Solid);
    let format_for = |highlight: Highlight| match highlight {
        Highlight::Original => &original_format,
        Highlight::Forced => &forced_format,
    };

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&options.sheet_name)?;

    for (index, column) in table.columns.iter().enumerate() {
        let col = column_number(index)?;
        worksheet.write_string(0, col, &column.name)?;
        worksheet.set_column_width(col, column.width as f64)?;
    }

    for (row_index, row) in table.rows.iter().enumerate() {
        let sheet_row = row_number(row_index + 1)?;
        for (col_index, value) in row.iter().enumerate() {
            let col = column_number(col_index)?;
            match (value, table.highlight(row_index, col_index)) {
                (Some(value), Some(highlight)) => {
                    worksheet.write_string_with_format(sheet_row, col, value, format_for(highlight))?;
                }
                (Some(value), None) => {
                    worksheet.write_string(sheet_row, col, value)?;
                }
                (None, Some(highlight)) => {
                    worksheet.write_blank(sheet_row, col, format_for(highlight))?;
                }
                (None, None) => {}
            }
        }
    }

    if table.row_count() > 0 && table.column_count() > 0 {
        let columns: Vec<TableColumn> = table
            .columns
            .iter()
            .map(|column| TableColumn::new().set_header(&column.name))
            .collect();
        let region = Table::new()
            .set_name(&options.table_name)
            .set_style(TableStyle::Medium9)
            .set_banded_rows(true)
            .set_columns(&columns);
        worksheet.add_table(
            0,
            0,
            row_number(table.row_count())?,
            column_number(table.column_count() - 1)?,
            &region,
        )?;
    } else {
        log::debug!("No data rows; skipping table region");
    }

    Ok(workbook.save_to_buffer()?)
}

fn row_number(index: usize) -> Result<u32> {
    u32::try_from(index)
        .ok()
        .filter(|row| *row < 1_048_576)
        .ok_or_else(|| ForceDiffError::malformed_input("Too many rows for a worksheet"))
}

fn column_number(index: usize) -> Result<u16> {
    u16::try_from(index)
        .ok()
        .filter(|col| *col < 16_384)
        .ok_or_else(|| ForceDiffError::malformed_input("Too many columns for a worksheet"))
}
