use std::path::PathBuf;

/// Errors that can occur during dataset operations
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// I/O error while listing the source directory
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The source directory does not exist or is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// `mark_analyzed` was called on a file that is not pending
    #[error("File is not pending: {0}")]
    NotPending(PathBuf),

    /// There is no pending file to inspect
    #[error("No pending files in {0}")]
    NoPendingFiles(PathBuf),

    /// The chromatography tag is neither C18 nor HILIC
    #[error("Unrecognized chromatography '{tag}' in {file}")]
    UnknownChromatography {
        /// File that was inspected
        file: PathBuf,
        /// Tag found at the chromatography position
        tag: String,
    },
}
