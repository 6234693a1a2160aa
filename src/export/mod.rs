//! # Snapshot Export
//!
//! Writes the accumulated result tables to a `qc_output_<label>/` directory.
//! Checkpoints are labelled with the cumulative number of analyzed files, the
//! final export with `full`:
//!
//! ```text
//! qc_output_<label>/
//! ├── ms1_data_sheet.csv
//! ├── ms1_tic_data_sheet.csv
//! ├── ms2_data_sheet.csv            # only when MS2 rows exist
//! ├── file_name_warnings_report.csv
//! ├── ms1_data_sheet.parquet
//! ├── ms1_tic_data_sheet.parquet
//! ├── ms2_data_sheet.parquet        # only when MS2 rows exist
//! └── manifest.json
//! ```
//!
//! With archiving enabled the directory is also packed into
//! `qc_output_<label>.zip` next to it.

mod error;
pub mod columnar;

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub use error::ExportError;

use crate::filename::{write_warnings_report, FilenameMessages};
use crate::store::{write_table, ResultBatch, MS2_COLUMNS, PEAK_COLUMNS, TIC_COLUMNS};

/// MS1 peak sheet
pub const PEAK_SHEET: &str = "ms1_data_sheet";
/// MS1 TIC sheet
pub const TIC_SHEET: &str = "ms1_tic_data_sheet";
/// MS2 match sheet
pub const MS2_SHEET: &str = "ms2_data_sheet";
/// Filename warnings report
pub const WARNINGS_REPORT: &str = "file_name_warnings_report.csv";
/// Snapshot manifest
pub const MANIFEST: &str = "manifest.json";

/// Which export a snapshot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLabel {
    /// Mid-session export after this many analyzed files
    Checkpoint(usize),
    /// Final export
    Full,
}

impl fmt::Display for SnapshotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotLabel::Checkpoint(n) => write!(f, "{}", n),
            SnapshotLabel::Full => write!(f, "full"),
        }
    }
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// Monitoring session
    pub session_id: Uuid,
    /// Snapshot label
    pub label: String,
    /// When the snapshot was written
    pub created_at: DateTime<Utc>,
    /// Rows in the MS1 peak sheet
    pub ms1_peak_rows: usize,
    /// Rows in the MS1 TIC sheet
    pub ms1_tic_rows: usize,
    /// Rows in the MS2 sheet
    pub ms2_rows: usize,
    /// Files written to the snapshot directory
    pub files: Vec<String>,
}

/// Statistics from a completed snapshot export
#[derive(Debug, Clone)]
pub struct ExportStats {
    /// Snapshot label
    pub label: SnapshotLabel,
    /// Snapshot directory
    pub directory: PathBuf,
    /// Zip archive, when archiving is enabled
    pub archive: Option<PathBuf>,
    /// MS1 peak rows written
    pub peak_rows: usize,
    /// MS1 TIC rows written
    pub tic_rows: usize,
    /// MS2 rows written
    pub ms2_rows: usize,
}

impl fmt::Display for ExportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snapshot {}: {} peak rows, {} TIC rows, {} MS2 rows -> {}",
            self.label,
            self.peak_rows,
            self.tic_rows,
            self.ms2_rows,
            self.directory.display()
        )
    }
}

/// Writes snapshot directories under an output root
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    output_root: PathBuf,
    session_id: Uuid,
    write_parquet: bool,
    archive: bool,
}

impl SnapshotExporter {
    /// Exporter writing CSV and Parquet under `output_root`
    pub fn new(output_root: impl Into<PathBuf>, session_id: Uuid) -> Self {
        Self {
            output_root: output_root.into(),
            session_id,
            write_parquet: true,
            archive: false,
        }
    }

    /// Enable or disable the Parquet copies
    pub fn with_parquet(mut self, enabled: bool) -> Self {
        self.write_parquet = enabled;
        self
    }

    /// Enable or disable the zip archive
    pub fn with_archive(mut self, enabled: bool) -> Self {
        self.archive = enabled;
        self
    }

    /// Directory a snapshot with `label` is written to
    pub fn snapshot_dir(&self, label: SnapshotLabel) -> PathBuf {
        self.output_root.join(format!("qc_output_{}", label))
    }

    /// Write one snapshot of `tables` plus the filename warnings
    pub fn export(
        &self,
        label: SnapshotLabel,
        tables: &ResultBatch,
        warnings: &[FilenameMessages],
    ) -> Result<ExportStats, ExportError> {
        let dir = self.snapshot_dir(label);
        fs::create_dir_all(&dir)?;
        let mut files = Vec::new();

        let sheet = |name: &str, ext: &str| format!("{}.{}", name, ext);

        write_table(&dir.join(sheet(PEAK_SHEET, "csv")), PEAK_COLUMNS, &tables.peaks)?;
        files.push(sheet(PEAK_SHEET, "csv"));
        write_table(&dir.join(sheet(TIC_SHEET, "csv")), TIC_COLUMNS, &tables.tics)?;
        files.push(sheet(TIC_SHEET, "csv"));
        if !tables.ms2_matches.is_empty() {
            write_table(&dir.join(sheet(MS2_SHEET, "csv")), MS2_COLUMNS, &tables.ms2_matches)?;
            files.push(sheet(MS2_SHEET, "csv"));
        }

        write_warnings_report(&dir.join(WARNINGS_REPORT), warnings)?;
        files.push(WARNINGS_REPORT.to_string());

        if self.write_parquet {
            columnar::write_peaks(&dir.join(sheet(PEAK_SHEET, "parquet")), &tables.peaks)?;
            files.push(sheet(PEAK_SHEET, "parquet"));
            columnar::write_tics(&dir.join(sheet(TIC_SHEET, "parquet")), &tables.tics)?;
            files.push(sheet(TIC_SHEET, "parquet"));
            if !tables.ms2_matches.is_empty() {
                columnar::write_ms2(&dir.join(sheet(MS2_SHEET, "parquet")), &tables.ms2_matches)?;
                files.push(sheet(MS2_SHEET, "parquet"));
            }
        }

        let manifest = SnapshotManifest {
            session_id: self.session_id,
            label: label.to_string(),
            created_at: Utc::now(),
            ms1_peak_rows: tables.peaks.len(),
            ms1_tic_rows: tables.tics.len(),
            ms2_rows: tables.ms2_matches.len(),
            files: files.clone(),
        };
        fs::write(dir.join(MANIFEST), serde_json::to_string_pretty(&manifest)?)?;
        files.push(MANIFEST.to_string());

        let archive = if self.archive {
            let path = dir.with_extension("zip");
            write_archive(&path, &dir, &files)?;
            Some(path)
        } else {
            None
        };

        let stats = ExportStats {
            label,
            directory: dir,
            archive,
            peak_rows: tables.peaks.len(),
            tic_rows: tables.tics.len(),
            ms2_rows: tables.ms2_matches.len(),
        };
        info!("{}", stats);
        Ok(stats)
    }
}

/// Pack `files` from `dir` into a zip at `path`.
///
/// Parquet entries are stored uncompressed; they carry their own compression.
fn write_archive(path: &Path, dir: &Path, files: &[String]) -> Result<(), ExportError> {
    let prefix = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut zip = ZipWriter::new(BufWriter::new(File::create(path)?));

    for name in files {
        let method = if name.ends_with(".parquet") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .unix_permissions(0o644);
        zip.start_file(format!("{}/{}", prefix, name), options)?;
        zip.write_all(&fs::read(dir.join(name))?)?;
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}
