//! Reconciliation pipeline: filter, compare, build both tables, render both artifacts

use crate::annotated::AnnotatedTable;
use crate::config::ReconcileConfig;
use crate::dataset::Dataset;
use crate::diff_table::DiffTable;
use crate::error::{Result, SchemaWarning};
use crate::export::{
    annotated_to_xlsx, diff_table_to_csv, Artifact, ExportFormat, ExportOptions, WorkbookOptions,
};
use crate::filter::{reference_instant, RecordFilter};
use crate::naming::ReportNamer;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Row and mismatch counts for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_without_timestamp: usize,
    pub dropped_stale: usize,
    pub window_days: u32,
    pub cutoff: String,
    pub mismatches: usize,
    pub mismatches_by_field: Vec<(String, usize)>,
}

/// Everything one run produces. Both artifacts are always present.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub diff_table: DiffTable,
    pub annotated_table: AnnotatedTable,
    pub csv: Artifact,
    pub excel: Artifact,
    pub warnings: Vec<SchemaWarning>,
    pub summary: ReconcileSummary,
}

/// Runs the reconciliation pipeline with a fixed configuration.
///
/// A `Reconciler` holds no per-run state; `run` takes an immutable dataset
/// snapshot and can be called from several threads at once.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcileConfig,
    filter: RecordFilter,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Result<Self> {
        config.validate()?;
        let filter = RecordFilter::new(config.window.days)?;
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Decode comma-separated bytes and run the pipeline
    pub fn run_csv(&self, bytes: &[u8], now: DateTime<Utc>) -> Result<ReconciliationReport> {
        let dataset = Dataset::from_csv_bytes(bytes, &self.config)?;
        self.run(&dataset, now)
    }

    pub fn run(&self, dataset: &Dataset, now: DateTime<Utc>) -> Result<ReconciliationReport> {
        let config = &self.config;
        let identifier = config.columns.identifier.as_str();
        log::info!(
            "Reconciling {} rows against {} field pairs ({}-day window)",
            dataset.len(),
            config.pairs.len(),
            config.window.days
        );

        let reference = reference_instant(now, config.window.timestamps);
        let filtered = self.filter.filter(dataset, reference)?;

        let diff_table = DiffTable::build(&filtered.kept, &config.pairs, identifier);
        let annotated_table = AnnotatedTable::build(
            &filtered.kept,
            &config.pairs,
            identifier,
            config.report.highlight_original,
        );

        let mut warnings = diff_table.warnings.clone();
        warnings.extend(missing_pair_columns(dataset, config));
        for warning in &warnings {
            log::warn!("Schema warning: {warning}");
        }

        let names = ReportNamer::new(&config.report.name_pattern, &config.report.prefix).name(now)?;
        let csv_bytes = diff_table_to_csv(
            &diff_table,
            &ExportOptions {
                include_header: true,
                delimiter: config.report.delimiter,
            },
        )?;
        let excel_bytes = annotated_to_xlsx(
            &annotated_table,
            &WorkbookOptions {
                sheet_name: config.report.sheet_name.clone(),
                table_name: config.report.table_name.clone(),
                created: now,
            },
        )?;

        let summary = ReconcileSummary {
            input_rows: dataset.len(),
            kept_rows: filtered.kept.len(),
            dropped_without_timestamp: filtered.dropped_null,
            dropped_stale: filtered.dropped_stale,
            window_days: self.filter.window_days(),
            cutoff: filtered.cutoff.to_string(),
            mismatches: diff_table.len(),
            mismatches_by_field: diff_table.counts_by_field(),
        };
        log::info!(
            "Found {} mismatches in {} active rows",
            summary.mismatches,
            summary.kept_rows
        );

        Ok(ReconciliationReport {
            csv: Artifact::new(names.csv, ExportFormat::Csv, csv_bytes),
            excel: Artifact::new(names.excel, ExportFormat::Excel, excel_bytes),
            diff_table,
            annotated_table,
            warnings,
            summary,
        })
    }
}

/// One warning per configured pair column the dataset lacks
pub fn missing_pair_columns(dataset: &Dataset, config: &ReconcileConfig) -> Vec<SchemaWarning> {
    let mut warnings = Vec::new();
    for pair in &config.pairs {
        for column in [&pair.original, &pair.forced] {
            if !dataset.has_column(column) {
                warnings.push(SchemaWarning::MissingPairColumn {
                    pair: pair.label().to_string(),
                    column: column.clone(),
                });
            }
        }
    }
    warnings
}

/// Run the pipeline once with the given configuration
pub fn reconcile(
    dataset: &Dataset,
    now: DateTime<Utc>,
    config: ReconcileConfig,
) -> Result<ReconciliationReport> {
    Reconciler::new(config)?.run(dataset, now)
}
