use std::path::PathBuf;

use crate::atlas::AtlasError;
use crate::dataset::DatasetError;
use crate::export::ExportError;
use crate::store::StoreError;

/// Infrastructure failures of the monitor.
///
/// Session aborts (non-centroid data, unreadable files) are not errors; they
/// are reported through [`super::MonitorOutcome::Aborted`].
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// I/O error writing startup reports
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Dataset listing or bookkeeping failed
    #[error("Dataset error: {0}")]
    DatasetError(#[from] DatasetError),

    /// Result store failure
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Snapshot export failure
    #[error("Export error: {0}")]
    ExportError(#[from] ExportError),

    /// Atlas could not be loaded
    #[error("Atlas error: {0}")]
    AtlasError(#[from] AtlasError),

    /// Filename validation reported errors at startup
    #[error("Filename errors in {count} files, see {}", .report.display())]
    FilenameErrors {
        /// Files with at least one error
        count: usize,
        /// Errors report written to the source directory
        report: PathBuf,
    },

    /// The store was used after teardown
    #[error("Result store already torn down")]
    StoreClosed,
}
