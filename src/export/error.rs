/// Errors that can occur while writing a snapshot
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// I/O error while writing the snapshot
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error writing a CSV sheet
    #[error("Store error: {0}")]
    StoreError(#[from] crate::store::StoreError),

    /// Error building Arrow arrays
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Error writing Parquet
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Error serializing the manifest
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Error from the ZIP container library
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),
}
