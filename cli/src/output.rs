//! Output formatting utilities

use anyhow::Result;
use forcediff_core::{FieldPair, ForceDiffError, ReconciliationReport};
use std::path::PathBuf;

/// Pretty printer for forcediff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the outcome of a `diff` run
    pub fn print_run(report: &ReconciliationReport, paths: &[PathBuf]) {
        let summary = &report.summary;
        println!("🔍 Forced field differences");
        println!(
            "├─ Rows: {} read, {} active since {}",
            summary.input_rows, summary.kept_rows, summary.cutoff
        );
        println!(
            "├─ Dropped: {} without timestamp, {} older than {} days",
            summary.dropped_without_timestamp, summary.dropped_stale, summary.window_days
        );

        if summary.mismatches == 0 {
            println!("├─ ✅ Mismatches: none");
        } else {
            println!("├─ ❌ Mismatches: {}", summary.mismatches);
            for (i, (field, count)) in summary.mismatches_by_field.iter().enumerate() {
                let prefix = if i == summary.mismatches_by_field.len() - 1 {
                    "│  └─"
                } else {
                    "│  ├─"
                };
                println!("{prefix} {field}: {count}");
            }
        }

        for warning in &report.warnings {
            println!("├─ ⚠️  {warning}");
        }

        println!("└─ Reports:");
        let artifacts = [&report.csv, &report.excel];
        for (i, (artifact, path)) in artifacts.iter().zip(paths).enumerate() {
            let prefix = if i == artifacts.len() - 1 {
                "   └─"
            } else {
                "   ├─"
            };
            println!(
                "{prefix} {} ({})",
                path.display(),
                format_bytes(artifact.len() as u64)
            );
        }
    }

    /// Print the configured field pairs
    pub fn print_pairs(pairs: &[FieldPair]) {
        if pairs.is_empty() {
            println!("No field pairs configured.");
            return;
        }

        println!("🔗 Field pairs:");
        for (i, pair) in pairs.iter().enumerate() {
            let prefix = if i == pairs.len() - 1 { "└─" } else { "├─" };
            println!(
                "{prefix} {}: {} ↔ {}",
                pair.label(),
                pair.original,
                pair.forced
            );
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format the outcome of a `diff` run as JSON
    pub fn format_run(report: &ReconciliationReport, paths: &[PathBuf]) -> Result<String> {
        let json = serde_json::json!({
            "summary": report.summary,
            "warnings": report.warnings,
            "artifacts": [report.csv, report.excel],
            "paths": paths,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Format a failed envelope request as `{"error": ..., "kind": ...}`
    pub fn format_envelope_error(error: &anyhow::Error) -> Result<String> {
        let (message, kind) = match error.downcast_ref::<ForceDiffError>() {
            Some(ForceDiffError::MalformedInput(msg)) => {
                (format!("Invalid CSV data: {msg}"), "malformed_input")
            }
            Some(core_error) => (core_error.to_string(), core_error.kind()),
            None => (format!("{error:#}"), "request"),
        };
        let json = serde_json::json!({ "error": message, "kind": kind });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
