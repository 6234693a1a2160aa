use std::path::PathBuf;

/// Errors that can occur while loading a compound atlas
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// I/O error reading the atlas file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV row or header
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// The atlas has no compounds
    #[error("Atlas contains no compounds: {0}")]
    Empty(PathBuf),

    /// A compound row is unusable
    #[error("Invalid atlas entry '{compound}': {reason}")]
    InvalidEntry {
        /// Compound name
        compound: String,
        /// What was wrong
        reason: String,
    },
}
