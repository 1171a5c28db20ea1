use crate::error::{ForceDiffError, Result};
use crate::export::ExportFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Timestamp layout used for the `{timestamp}` variable
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Names for the two report artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNames {
    pub csv: String,
    pub excel: String,
}

/// Derives artifact names from a pattern and the run's reference instant.
///
/// Variables: `{prefix}`, `{timestamp}`, `{date}`, `{time}`, `{iso_date}`.
/// The pattern is scanned once, left to right, so substituted values are
/// never expanded again. Unknown variables are left as written. Two runs in
/// the same second get the same names.
pub struct ReportNamer {
    pattern: String,
    prefix: String,
}

impl ReportNamer {
    pub fn new(pattern: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            prefix: prefix.into(),
        }
    }

    pub fn generate_stem(&self, now: DateTime<Utc>) -> Result<String> {
        let variables = self.build_variables(now);
        let mut result = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();

        while let Some(start) = rest.find('{') {
            result.push_str(&rest[..start]);
            let token = &rest[start..];
            let Some(end) = token.find('}') else {
                result.push_str(token);
                rest = "";
                break;
            };
            let key = &token[1..end];
            match variables.iter().find(|(name, _)| *name == key) {
                Some((_, value)) => result.push_str(value),
                None => result.push_str(&token[..=end]),
            }
            rest = &token[end + 1..];
        }
        result.push_str(rest);

        let result = result.trim().to_string();
        if result.is_empty() || result.contains(&['/', '\\'][..]) {
            return Err(ForceDiffError::configuration(format!(
                "Name pattern '{}' produced an unusable file name '{result}'",
                self.pattern
            )));
        }
        Ok(result)
    }

    pub fn name(&self, now: DateTime<Utc>) -> Result<ReportNames> {
        let stem = self.generate_stem(now)?;
        Ok(ReportNames {
            csv: format!("{stem}.{}", ExportFormat::Csv.extension()),
            excel: format!("{stem}.{}", ExportFormat::Excel.extension()),
        })
    }

    fn build_variables(&self, now: DateTime<Utc>) -> [(&'static str, String); 5] {
        [
            ("prefix", self.prefix.clone()),
            ("timestamp", now.format(TIMESTAMP_FORMAT).to_string()),
            ("date", now.format("%Y%m%d").to_string()),
            ("time", now.format("%H%M%S").to_string()),
            ("iso_date", now.format("%Y-%m-%d").to_string()),
        ]
    }
}
