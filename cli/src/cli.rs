//! Command-line interface for forcediff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forcediff")]
#[command(about = "Report where forced field values diverge from the originals")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Read configuration from this file instead of the usual locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile a CSV file and write the CSV and XLSX reports
    Diff {
        /// Input CSV file
        input: PathBuf,

        /// Directory to write the reports into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Override the recency window in days
        #[arg(long)]
        window_days: Option<u32>,

        /// Reference instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,

        /// Overwrite existing report files
        #[arg(long)]
        force: bool,

        /// Output the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process a JSON request envelope carrying base64 CSV content
    Envelope {
        /// Request file; reads stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Inspect the resolved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration as TOML
    Show,

    /// List the configured field pairs
    Pairs,
}
