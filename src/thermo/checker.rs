use std::path::Path;

use log::debug;
use thermorawfilereader::schema::SpectrumMode;
use thermorawfilereader::RawFileReader;

use super::ThermoError;
use crate::spectra::{evenly_spaced_indices, CollectionModeChecker, SourceError};

/// Check if the current platform supports Thermo RAW file reading.
fn check_platform_support() -> Result<(), ThermoError> {
    // Thermo's RawFileReader .NET assemblies only support x86/x86_64 architectures
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        return Err(ThermoError::PlatformNotSupported(format!(
            "Current architecture '{}' is not supported",
            std::env::consts::ARCH
        )));
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Ok(())
}

fn open_raw(path: &Path) -> Result<RawFileReader, ThermoError> {
    check_platform_support()?;

    if !path.exists() {
        return Err(ThermoError::InvalidPath(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    if path.extension().map(|e| e.to_ascii_lowercase()) != Some("raw".into()) {
        return Err(ThermoError::InvalidPath(format!(
            "Expected .raw extension: {}",
            path.display()
        )));
    }

    let mut reader = RawFileReader::open(path)
        .map_err(|e| ThermoError::OpenError(format!("{}: {}", path.display(), e)))?;
    // Only headers are needed, and vendor centroiding would hide profile scans.
    reader.set_signal_loading(false);
    reader.set_centroid_spectra(false);
    Ok(reader)
}

/// Samples evenly spaced scans of a RAW file and checks their acquisition mode
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermoModeChecker;

impl ThermoModeChecker {
    fn check(&self, path: &Path, sample_size: usize) -> Result<bool, ThermoError> {
        let reader = open_raw(path)?;
        let total = reader.len();
        if total == 0 {
            return Err(ThermoError::ReadError(format!(
                "{} contains no scans",
                path.display()
            )));
        }

        for idx in evenly_spaced_indices(total, sample_size) {
            let spectrum = reader.get(idx).ok_or_else(|| {
                ThermoError::ReadError(format!("{}: scan {} unreadable", path.display(), idx + 1))
            })?;
            if !matches!(spectrum.mode(), SpectrumMode::Centroid) {
                debug!("{}: scan {} is not centroided", path.display(), idx + 1);
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl CollectionModeChecker for ThermoModeChecker {
    fn is_centroided(&mut self, raw: &Path, sample_size: usize) -> Result<bool, SourceError> {
        self.check(raw, sample_size).map_err(|e| match e {
            ThermoError::ReadError(reason) | ThermoError::OpenError(reason) => {
                SourceError::Corrupt {
                    path: raw.to_path_buf(),
                    reason,
                }
            }
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path() {
        let result = ThermoModeChecker.check(Path::new("/nonexistent/file.raw"), 10);
        assert!(matches!(
            result,
            Err(ThermoError::InvalidPath(_)) | Err(ThermoError::PlatformNotSupported(_))
        ));
    }

    #[test]
    fn test_wrong_extension() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = ThermoModeChecker.check(file.path(), 10);
        assert!(matches!(
            result,
            Err(ThermoError::InvalidPath(_)) | Err(ThermoError::PlatformNotSupported(_))
        ));
    }
}
