use crate::error::{ForceDiffError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = "forcediff.toml";

/// Top-level reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<FieldPair>,
    #[serde(default)]
    pub report: ReportConfig,
}

/// How `lastused` values and the reference instant are compared
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampConvention {
    /// Offset-carrying timestamps, normalised to UTC
    #[default]
    Utc,
    /// Wall-clock timestamps without an offset, read as UTC wall-clock
    Naive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "default_window_days")]
    pub days: u32,
    #[serde(default)]
    pub timestamps: TimestampConvention,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnConfig {
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default = "default_last_used")]
    pub last_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Pattern for artifact names; see [`crate::naming::ReportNamer`]
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Also mark the original-value cell of a mismatching pair
    #[serde(default = "default_true")]
    pub highlight_original: bool,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

/// A named (original column, forced column) relationship
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldPair {
    /// Label used in the `field` column of the diff table; defaults to the original column
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub original: String,
    pub forced: String,
}

impl FieldPair {
    pub fn new(original: impl Into<String>, forced: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            name: original.clone(),
            original,
            forced: forced.into(),
        }
    }

    pub fn named(
        name: impl Into<String>,
        original: impl Into<String>,
        forced: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            original: original.into(),
            forced: forced.into(),
        }
    }

    /// Label of this pair, falling back to the original column name
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.original
        } else {
            &self.name
        }
    }

    /// The conventional `<x>` / `<x>-forced` pair
    pub fn forced_suffix(field: &str) -> Self {
        Self::new(field, format!("{field}-forced"))
    }
}

fn default_window_days() -> u32 {
    60
}

fn default_identifier() -> String {
    "username".to_string()
}

fn default_last_used() -> String {
    "lastused".to_string()
}

fn default_name_pattern() -> String {
    "{prefix}_{timestamp}".to_string()
}

fn default_prefix() -> String {
    "output2".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sheet_name() -> String {
    "Field Differences".to_string()
}

fn default_table_name() -> String {
    "ForcedDifferences".to_string()
}

fn default_delimiter() -> char {
    ','
}

/// The five pairs audited out of the box
pub fn default_pairs() -> Vec<FieldPair> {
    ["email", "phone", "title", "name", "mobile"]
        .iter()
        .map(|field| FieldPair::forced_suffix(field))
        .collect()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            columns: ColumnConfig::default(),
            pairs: default_pairs(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_window_days(),
            timestamps: TimestampConvention::default(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            last_used: default_last_used(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            name_pattern: default_name_pattern(),
            prefix: default_prefix(),
            highlight_original: true,
            sheet_name: default_sheet_name(),
            table_name: default_table_name(),
            delimiter: default_delimiter(),
        }
    }
}

impl ReconcileConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ForceDiffError::configuration(format!("Invalid config: {e}")))
    }

    /// Load and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ForceDiffError::configuration(format!(
                "Cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ForceDiffError::configuration(format!("Cannot serialize config: {e}")))
    }

    /// Columns the pipeline reads: identifier, timestamp, then every pair column
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns = vec![self.columns.identifier.clone(), self.columns.last_used.clone()];
        for pair in &self.pairs {
            for column in [&pair.original, &pair.forced] {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        columns
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.days == 0 {
            return Err(ForceDiffError::configuration(
                "window.days must be a positive number of days",
            ));
        }

        if self.columns.identifier.is_empty() || self.columns.last_used.is_empty() {
            return Err(ForceDiffError::configuration(
                "columns.identifier and columns.last_used must not be empty",
            ));
        }

        if self.pairs.is_empty() {
            return Err(ForceDiffError::configuration(
                "At least one field pair must be configured",
            ));
        }

        let mut labels = HashSet::new();
        for pair in &self.pairs {
            if pair.original.is_empty() || pair.forced.is_empty() {
                return Err(ForceDiffError::configuration(format!(
                    "Field pair '{}' has an empty column name",
                    pair.label()
                )));
            }
            if pair.original == pair.forced {
                return Err(ForceDiffError::configuration(format!(
                    "Field pair '{}' compares column '{}' with itself",
                    pair.label(),
                    pair.original
                )));
            }
            for column in [&pair.original, &pair.forced] {
                if *column == self.columns.identifier || *column == self.columns.last_used {
                    return Err(ForceDiffError::configuration(format!(
                        "Field pair '{}' uses column '{column}', which is reserved for the identifier or timestamp",
                        pair.label()
                    )));
                }
            }
            if !labels.insert(pair.label()) {
                return Err(ForceDiffError::configuration(format!(
                    "Duplicate field pair name '{}'",
                    pair.label()
                )));
            }
        }

        // Spreadsheet table headers must be unique ignoring case
        let mut headers: HashMap<String, &str> = HashMap::new();
        let report_columns = std::iter::once(&self.columns.identifier)
            .chain(self.pairs.iter().flat_map(|pair| [&pair.original, &pair.forced]));
        for column in report_columns {
            if let Some(previous) = headers.insert(column.to_lowercase(), column.as_str()) {
                if previous != column.as_str() {
                    return Err(ForceDiffError::configuration(format!(
                        "Columns '{previous}' and '{column}' differ only by case"
                    )));
                }
            }
        }

        let report = &self.report;
        if report.name_pattern.trim().is_empty() {
            return Err(ForceDiffError::configuration(
                "report.name_pattern must not be empty",
            ));
        }
        if report.name_pattern.contains(&['/', '\\'][..]) || report.prefix.contains(&['/', '\\'][..]) {
            return Err(ForceDiffError::configuration(
                "report.name_pattern and report.prefix must not contain path separators",
            ));
        }
        if !report.delimiter.is_ascii() || report.delimiter == '"' || report.delimiter == '\n' {
            return Err(ForceDiffError::configuration(format!(
                "Unsupported delimiter {:?}",
                report.delimiter
            )));
        }
        validate_sheet_name(&report.sheet_name)?;
        validate_table_name(&report.table_name)?;

        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.chars().count() > 31
        || name.contains(&['[', ']', ':', '*', '?', '/', '\\'][..])
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(ForceDiffError::configuration(format!(
            "Invalid worksheet name '{name}'"
        )));
    }
    Ok(())
}

fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_' || c == '\\')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if !valid_start || !valid_rest || name.chars().count() > 255 {
        return Err(ForceDiffError::configuration(format!(
            "Invalid table name '{name}'"
        )));
    }
    Ok(())
}

fn global_config_path() -> PathBuf {
    let config_dir = if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".forcediff")
    } else {
        PathBuf::from(".forcediff")
    };
    config_dir.join("global.toml")
}

fn load_optional(path: &Path) -> Option<ReconcileConfig> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path)
        .map_err(ForceDiffError::from)
        .and_then(|content| ReconcileConfig::from_toml_str(&content))
    {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Skipping config file {}: {e}", path.display());
            None
        }
    }
}

/// Resolve the effective configuration.
///
/// Priority order (highest to lowest):
/// 1. Explicit file (argument, then FORCEDIFF_CONFIG env var)
/// 2. Local config file (forcediff.toml in the current directory)
/// 3. Global config file (~/.forcediff/global.toml)
/// 4. Built-in defaults
///
/// FORCEDIFF_WINDOW_DAYS overrides the window in every case.
pub fn get_config(explicit: Option<&Path>) -> Result<ReconcileConfig> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var("FORCEDIFF_CONFIG").ok().map(PathBuf::from));

    let mut config = if let Some(path) = explicit {
        log::debug!("Loading config from {}", path.display());
        ReconcileConfig::from_toml_str(&fs::read_to_string(&path).map_err(|e| {
            ForceDiffError::configuration(format!(
                "Cannot read config file {}: {e}",
                path.display()
            ))
        })?)?
    } else {
        let local = env::current_dir()
            .ok()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .and_then(|path| load_optional(&path));
        local
            .or_else(|| load_optional(&global_config_path()))
            .unwrap_or_default()
    };

    if let Ok(days) = env::var("FORCEDIFF_WINDOW_DAYS") {
        config.window.days = days.trim().parse().map_err(|_| {
            ForceDiffError::configuration(format!(
                "FORCEDIFF_WINDOW_DAYS must be a positive integer, got '{days}'"
            ))
        })?;
    }

    config.validate()?;
    Ok(config)
}

/// Describe where configuration would be read from, for `config show`
pub fn config_resolution_order(explicit: Option<&Path>) -> Vec<String> {
    let mut order = Vec::new();
    if let Some(path) = explicit {
        order.push(format!("--config argument: {}", path.display()));
    }
    if let Ok(path) = env::var("FORCEDIFF_CONFIG") {
        order.push(format!("FORCEDIFF_CONFIG environment variable: {path}"));
    }
    if let Ok(dir) = env::current_dir() {
        order.push(format!(
            "Current directory config: {}",
            dir.join(LOCAL_CONFIG_FILE).display()
        ));
    }
    order.push(format!("Global config: {}", global_config_path().display()));
    order.push("Built-in defaults".to_string());
    order
}
