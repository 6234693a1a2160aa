use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dataset::DEFAULT_EXTENSION;
use crate::extraction::ExtractionConfig;
use crate::ms2::DiagnosticPanel;

/// Default sleep between directory polls while no files are pending
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
/// Default extra wait added after the age gate
pub const DEFAULT_AGE_MARGIN: Duration = Duration::from_secs(200);
/// Default minimum file age before processing
pub const DEFAULT_MIN_FILE_AGE: Duration = Duration::from_secs(5 * 60);
/// Default number of scans sampled by the centroid check
pub const DEFAULT_CENTROID_SAMPLE_SIZE: usize = 10;

/// Configuration for one monitoring session
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory containing the acquisition files
    pub source_dir: PathBuf,

    /// Acquisition file extension
    pub extension: String,

    /// Number of files to analyze; `None` means every file pending at start
    pub target_files: Option<usize>,

    /// Minimum age of the youngest pending file before processing
    pub min_file_age: Duration,

    /// Mark blank injections analyzed without extraction
    pub skip_blanks: bool,

    /// Checkpoint export every N analyzed files; `None` disables checkpoints
    pub export_interval: Option<usize>,

    /// Sleep between polls while nothing is pending
    pub poll_interval: Duration,

    /// Extra sleep after the age gate
    pub age_margin: Duration,

    /// Scans sampled by the centroid check
    pub centroid_sample_size: usize,

    /// Parent directory of the per-session result store
    pub store_root: PathBuf,

    /// Where snapshots are written; `None` means the source directory
    pub output_root: Option<PathBuf>,

    /// Tolerances for extraction and matching
    pub extraction: ExtractionConfig,

    /// MS2 diagnostic panels
    pub panels: Vec<DiagnosticPanel>,

    /// Also write Parquet copies of the tables
    pub write_parquet: bool,

    /// Pack each snapshot into a zip archive
    pub archive: bool,

    /// Start even when the filename validator reports errors
    pub ignore_filename_errors: bool,
}

impl MonitorConfig {
    /// Defaults for monitoring `source_dir`
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            target_files: None,
            min_file_age: DEFAULT_MIN_FILE_AGE,
            skip_blanks: true,
            export_interval: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            age_margin: DEFAULT_AGE_MARGIN,
            centroid_sample_size: DEFAULT_CENTROID_SAMPLE_SIZE,
            store_root: std::env::temp_dir().join("ms-sentry"),
            output_root: None,
            extraction: ExtractionConfig::default(),
            panels: DiagnosticPanel::defaults(),
            write_parquet: true,
            archive: false,
            ignore_filename_errors: false,
        }
    }

    /// Snapshot directory parent
    pub fn output_root(&self) -> &Path {
        self.output_root.as_deref().unwrap_or(&self.source_dir)
    }
}
