//! Command implementations

use crate::cli::{Commands, ConfigCommand};
use crate::output::{JsonFormatter, PrettyPrinter};
use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use forcediff_core::config::{config_resolution_order, get_config};
use forcediff_core::{
    Artifact, ForceDiffError, ReconcileConfig, Reconciler, ReconciliationReport, SchemaWarning,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Diff {
            input,
            out_dir,
            window_days,
            now,
            force,
            json,
        } => diff_command(
            config_path,
            &input,
            &out_dir,
            window_days,
            now.as_deref(),
            force,
            json,
        ),
        Commands::Envelope { input } => envelope_command(config_path, input.as_deref()),
        Commands::Config { command } => config_command(config_path, &command),
    }
}

fn load_config(config_path: Option<&Path>, window_days: Option<u32>) -> Result<ReconcileConfig> {
    let mut config = get_config(config_path)?;
    if let Some(days) = window_days {
        log::debug!("Overriding window with {days} days from the command line");
        config.window.days = days;
    }
    Ok(config)
}

/// Parse an RFC 3339 reference instant, defaulting to the current time
fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(text) => {
            let parsed = DateTime::parse_from_rfc3339(text)
                .with_context(|| format!("Invalid --now value '{text}', expected RFC 3339"))?;
            Ok(parsed.with_timezone(&Utc))
        }
        None => Ok(Utc::now()),
    }
}

fn diff_command(
    config_path: Option<&Path>,
    input: &Path,
    out_dir: &Path,
    window_days: Option<u32>,
    now: Option<&str>,
    force: bool,
    json: bool,
) -> Result<()> {
    let reconciler = Reconciler::new(load_config(config_path, window_days)?)?;
    let now = parse_now(now)?;

    let bytes =
        fs::read(input).with_context(|| format!("Failed to read input {}", input.display()))?;
    let report = reconciler.run_csv(&bytes, now)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let paths = write_artifacts(out_dir, &[&report.csv, &report.excel], force)?;

    if json {
        println!("{}", JsonFormatter::format_run(&report, &paths)?);
    } else {
        PrettyPrinter::print_run(&report, &paths);
    }
    Ok(())
}

/// Stage every artifact in `out_dir`, then move them into place.
///
/// Nothing is persisted until all artifacts are staged, so a failed write
/// leaves no partial report behind.
fn write_artifacts(out_dir: &Path, artifacts: &[&Artifact], force: bool) -> Result<Vec<PathBuf>> {
    let targets: Vec<PathBuf> = artifacts
        .iter()
        .map(|artifact| out_dir.join(&artifact.name))
        .collect();

    if !force {
        if let Some(existing) = targets.iter().find(|path| path.exists()) {
            bail!(
                "{} already exists (use --force to overwrite)",
                existing.display()
            );
        }
    }

    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let mut file = NamedTempFile::new_in(out_dir)
            .with_context(|| format!("Failed to stage output in {}", out_dir.display()))?;
        file.write_all(&artifact.bytes)?;
        file.as_file().sync_all()?;
        staged.push(file);
    }

    for (file, target) in staged.into_iter().zip(&targets) {
        let persisted = if force {
            file.persist(target)
        } else {
            file.persist_noclobber(target)
        };
        persisted.with_context(|| format!("Failed to write {}", target.display()))?;
        log::debug!("Wrote {}", target.display());
    }

    Ok(targets)
}

#[derive(Debug, Deserialize)]
struct EnvelopeRequest {
    /// Base64-encoded CSV text
    csv_content: String,
    /// Optional RFC 3339 reference instant
    #[serde(default)]
    now: Option<String>,
}

#[derive(Debug, Serialize)]
struct EnvelopeResponse {
    output_csv_name: String,
    output_excel_name: String,
    csv_base64: String,
    excel_base64: String,
    warnings: Vec<SchemaWarning>,
}

impl EnvelopeResponse {
    fn from_report(report: &ReconciliationReport) -> Self {
        Self {
            output_csv_name: report.csv.name.clone(),
            output_excel_name: report.excel.name.clone(),
            csv_base64: BASE64.encode(&report.csv.bytes),
            excel_base64: BASE64.encode(&report.excel.bytes),
            warnings: report.warnings.clone(),
        }
    }
}

fn envelope_command(config_path: Option<&Path>, input: Option<&Path>) -> Result<()> {
    match process_envelope(config_path, input) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", JsonFormatter::format_envelope_error(&e)?);
            Err(e)
        }
    }
}

fn process_envelope(config_path: Option<&Path>, input: Option<&Path>) -> Result<EnvelopeResponse> {
    let raw = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read request from stdin")?;
            buffer
        }
    };

    let request: EnvelopeRequest =
        serde_json::from_str(&raw).context("Invalid request envelope")?;
    let csv_bytes = BASE64.decode(request.csv_content.trim()).map_err(|e| {
        ForceDiffError::malformed_input(format!("csv_content is not valid base64: {e}"))
    })?;
    let now = parse_now(request.now.as_deref())?;

    let reconciler = Reconciler::new(load_config(config_path, None)?)?;
    let report = reconciler.run_csv(&csv_bytes, now)?;
    log::info!(
        "Envelope produced {} and {}",
        report.csv.name,
        report.excel.name
    );
    Ok(EnvelopeResponse::from_report(&report))
}

fn config_command(config_path: Option<&Path>, command: &ConfigCommand) -> Result<()> {
    let config = get_config(config_path)?;
    match command {
        ConfigCommand::Show => {
            for source in config_resolution_order(config_path) {
                println!("# {source}");
            }
            println!("{}", config.to_toml_string()?);
        }
        ConfigCommand::Pairs => PrettyPrinter::print_pairs(&config.pairs),
    }
    Ok(())
}
