//! # forcediff-core
//!
//! Core library for forcediff - reconciles paired "original" and "forced"
//! fields in a tabular dataset and reports every mismatch among recently
//! active records.
//!
//! The crate takes an already-decoded dataset and a reference instant and
//! returns two in-memory artifacts: a sorted diff table rendered as
//! delimited text, and the full filtered table rendered as a highlighted
//! spreadsheet. Transport and storage are left to callers such as the CLI.

pub mod annotated;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod diff_table;
pub mod error;
pub mod export;
pub mod filter;
pub mod naming;
pub mod reconcile;

// Re-export the most commonly used types for convenience
pub use annotated::{AnnotatedTable, Highlight};
pub use compare::Mismatch;
pub use config::{FieldPair, ReconcileConfig, TimestampConvention};
pub use dataset::{Dataset, RecencyStamp, Record};
pub use diff_table::{DiffEntry, DiffTable};
pub use error::{ForceDiffError, Result, SchemaWarning};
pub use export::{Artifact, ExportFormat, ExportOptions};
pub use naming::{ReportNamer, ReportNames};
pub use reconcile::{reconcile, ReconcileSummary, Reconciler, ReconciliationReport};
