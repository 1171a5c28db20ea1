//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use forcediff_core::{Dataset, ReconcileConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture paths and utilities
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
    pub data_dir: PathBuf,
    pub configs_dir: PathBuf,
}

impl TestFixtures {
    /// Get the test fixtures directory
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");

        Self {
            data_dir: fixtures_dir.join("data"),
            configs_dir: fixtures_dir.join("configs"),
            fixtures_dir,
        }
    }

    /// Get path to a test data file
    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Get path to a test config file
    pub fn config_file(&self, name: &str) -> PathBuf {
        self.configs_dir.join(name)
    }

    pub fn read_data(&self, name: &str) -> Vec<u8> {
        fs::read(self.data_file(name)).expect("Failed to read data fixture")
    }

    pub fn load_config(&self, name: &str) -> ReconcileConfig {
        ReconcileConfig::from_file(&self.config_file(name)).expect("Failed to load config fixture")
    }

    /// Decode a data fixture with the given configuration
    pub fn dataset(&self, name: &str, config: &ReconcileConfig) -> Dataset {
        Dataset::from_csv_bytes(&self.read_data(name), config).expect("Failed to decode fixture")
    }
}

/// Reference instant shared by the fixture data: 2024-06-30 12:00:00 UTC.
/// With the default 60-day window the cutoff is 2024-05-01 12:00:00.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

/// Scratch directory for written artifacts
pub struct TestOutputDir {
    pub temp_dir: TempDir,
}

impl TestOutputDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write bytes under `name` and return the full path
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let target = self.path().join(name);
        fs::write(&target, bytes).expect("Failed to write artifact");
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_exist() {
        let fixtures = TestFixtures::new();
        assert!(fixtures.fixtures_dir.exists());
        assert!(fixtures.data_dir.exists());
        assert!(fixtures.configs_dir.exists());

        assert!(fixtures.data_file("users.csv").exists());
        assert!(fixtures.config_file("naive.toml").exists());
    }

    #[test]
    fn test_output_dir_creation() {
        let output = TestOutputDir::new();
        let path = output.write("probe.csv", b"a\n");
        assert!(path.exists());
    }
}
