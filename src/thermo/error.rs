//! Error types for Thermo RAW file inspection.

use thiserror::Error;

use crate::spectra::SourceError;

/// Errors that can occur while reading Thermo RAW scan headers.
#[derive(Error, Debug)]
pub enum ThermoError {
    /// Error opening the RAW file (file not found, invalid format, etc.)
    #[error("Failed to open RAW file: {0}")]
    OpenError(String),

    /// A sampled scan could not be read
    #[error("Spectrum read error: {0}")]
    ReadError(String),

    /// Path does not exist or is not a valid .raw file
    #[error("Invalid RAW path: {0}")]
    InvalidPath(String),

    /// Platform not supported (e.g., ARM architecture)
    #[error("Platform not supported: {0}. Thermo RAW reading requires x86/x86_64 architecture.")]
    PlatformNotSupported(String),
}

impl From<ThermoError> for SourceError {
    fn from(error: ThermoError) -> Self {
        match error {
            ThermoError::PlatformNotSupported(msg) => SourceError::Unsupported(msg),
            ThermoError::InvalidPath(msg) => SourceError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                msg,
            )),
            other => SourceError::Corrupt {
                path: std::path::PathBuf::new(),
                reason: other.to_string(),
            },
        }
    }
}
