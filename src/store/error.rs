use std::path::PathBuf;

/// Errors that can occur in the result store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error on the table files
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// The session directory already exists
    #[error("Result store already exists: {0}")]
    AlreadyExists(PathBuf),

    /// `initialize` has not been called
    #[error("Result store not initialized: {0}")]
    NotInitialized(PathBuf),
}
