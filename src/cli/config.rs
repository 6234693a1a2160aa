//! TOML configuration file support.
//!
//! Every key is optional; command-line flags override file values, which
//! override the library defaults:
//!
//! ```toml
//! # ms-sentry.toml
//! [monitor]
//! extension = "raw"
//! num_files = 40
//! min_file_age = 5.0        # minutes
//! skip_blanks = true
//! export_every = 10
//! poll_interval = 15        # seconds
//! age_margin = 200          # seconds
//! centroid_sample_size = 10
//! store_root = "/tmp/ms-sentry"
//! atlas_dir = "/opt/atlases"
//!
//! [extraction]
//! mz_tolerance = 0.0015
//! fragment_tolerance = 0.005
//! rt_window = 2.0
//! rt_filter = true
//!
//! [converter]
//! program = "ThermoRawFileParser"
//! args = ["-i={input}", "-o={output_dir}", "-f=2", "-L=1-", "-l=2"]
//!
//! [export]
//! output = "/data/qc"
//! parquet = true
//! archive = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for ms-sentry.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Control loop settings.
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Tolerances.
    #[serde(default)]
    pub extraction: ExtractionSection,

    /// External converter.
    #[serde(default)]
    pub converter: ConverterSection,

    /// Snapshot output.
    #[serde(default)]
    pub export: ExportSection,
}

/// `[monitor]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Acquisition file extension.
    pub extension: Option<String>,
    /// Number of files to analyze.
    pub num_files: Option<usize>,
    /// Minimum file age in minutes.
    pub min_file_age: Option<f64>,
    /// Skip blank injections.
    pub skip_blanks: Option<bool>,
    /// Checkpoint export interval in files.
    pub export_every: Option<usize>,
    /// Seconds between directory polls.
    pub poll_interval: Option<u64>,
    /// Seconds added after the age gate.
    pub age_margin: Option<u64>,
    /// Scans sampled by the centroid check.
    pub centroid_sample_size: Option<usize>,
    /// Parent directory of the result store.
    pub store_root: Option<PathBuf>,
    /// Directory holding `default_{c18,hilic}_atlas.csv`.
    pub atlas_dir: Option<PathBuf>,
}

/// `[extraction]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionSection {
    /// MS1 m/z tolerance (absolute).
    pub mz_tolerance: Option<f64>,
    /// Fragment m/z tolerance (absolute).
    pub fragment_tolerance: Option<f64>,
    /// Half-width of the RT window in minutes.
    pub rt_window: Option<f64>,
    /// Restrict extraction to the RT window.
    pub rt_filter: Option<bool>,
}

/// `[converter]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterSection {
    /// Converter executable.
    pub program: Option<PathBuf>,
    /// Argument templates with `{input}` and `{output_dir}` placeholders.
    pub args: Option<Vec<String>>,
}

/// `[export]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    /// Snapshot parent directory.
    pub output: Option<PathBuf>,
    /// Write Parquet copies.
    pub parquet: Option<bool>,
    /// Zip each snapshot.
    pub archive: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
