//! Spectral data contract between external converters and the extraction engine.
//!
//! Vendor access and format conversion stay behind two capability traits:
//! [`SpectralSource`] turns an acquisition file into a run of [`Spectrum`]
//! records, and [`CollectionModeChecker`] decides whether a file was acquired
//! in centroid mode. Nothing downstream depends on a particular converter.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Errors returned by spectral sources and collection-mode checkers
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error while reading converter output
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing mzML produced by the converter
    #[cfg(feature = "mzml")]
    #[error("mzML error: {0}")]
    MzMLError(#[from] crate::mzml::MzMLError),

    /// The external converter exited unsuccessfully
    #[error("Converter failed on {path}: {status}: {stderr}")]
    ConverterFailed {
        /// Input file
        path: PathBuf,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The converter finished but the expected output was not produced
    #[error("Converter output not found: {0}")]
    MissingOutput(PathBuf),

    /// The file is truncated, empty or otherwise unreadable
    #[error("Corrupt acquisition file {path}: {reason}")]
    Corrupt {
        /// Offending file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// A spectrum violated the contract (e.g. mismatched array lengths)
    #[error("Spectrum contract violation: {0}")]
    ContractViolation(String),

    /// Backend not available on this platform or build
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// One scan as delivered by a converter.
///
/// Invariants: `mz` and `intensity` have the same length; retention time is in minutes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// Position in the run (0-based)
    pub index: usize,
    /// MS level (1, 2, ...)
    pub ms_level: u8,
    /// Scan start time in minutes
    pub retention_time: f64,
    /// Peak m/z values
    pub mz: Vec<f64>,
    /// Peak intensities
    pub intensity: Vec<f64>,
    /// Selected precursor m/z for MS2+ scans
    pub precursor_mz: Option<f64>,
    /// Whether the scan holds centroided peaks
    pub centroided: bool,
    /// Total ion current reported by the instrument
    pub total_ion_current: Option<f64>,
}

impl Spectrum {
    /// Number of peaks
    pub fn peak_count(&self) -> usize {
        self.mz.len()
    }

    /// Sum of all peak intensities
    pub fn summed_intensity(&self) -> f64 {
        self.intensity.iter().sum()
    }

    /// Reported TIC, or the summed intensity when the converter gave none
    pub fn tic(&self) -> f64 {
        self.total_ion_current
            .unwrap_or_else(|| self.summed_intensity())
    }

    /// Check the array-length invariant
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.mz.len() != self.intensity.len() {
            return Err(SourceError::ContractViolation(format!(
                "spectrum {}: m/z array has {} values, intensity array has {}",
                self.index,
                self.mz.len(),
                self.intensity.len()
            )));
        }
        Ok(())
    }
}

/// Spectra produced from one acquisition file.
///
/// Holds the converter's scratch directory, if any; dropping the run
/// deletes the intermediate file.
#[derive(Debug)]
pub struct ConvertedRun {
    spectra: Vec<Spectrum>,
    intermediate: Option<TempDir>,
}

impl ConvertedRun {
    /// Wrap spectra that need no cleanup
    pub fn new(spectra: Vec<Spectrum>) -> Self {
        Self {
            spectra,
            intermediate: None,
        }
    }

    /// Wrap spectra backed by a scratch directory
    pub fn with_intermediate(spectra: Vec<Spectrum>, intermediate: TempDir) -> Self {
        Self {
            spectra,
            intermediate: Some(intermediate),
        }
    }

    /// All spectra in acquisition order
    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    /// Location of the intermediate output, while it exists
    pub fn intermediate_path(&self) -> Option<&Path> {
        self.intermediate.as_ref().map(|dir| dir.path())
    }

    /// Number of spectra
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    /// Whether the run has no spectra
    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }
}

/// Converts an acquisition file into a stream of spectra
pub trait SpectralSource {
    /// Convert `raw` and parse the result
    fn convert(&mut self, raw: &Path) -> Result<ConvertedRun, SourceError>;
}

/// Verifies that an acquisition was collected in centroid mode
pub trait CollectionModeChecker {
    /// Sample up to `sample_size` scans of `raw` and report whether all are centroided.
    ///
    /// Errors mean the file could not be inspected (corrupt or truncated).
    fn is_centroided(&mut self, raw: &Path, sample_size: usize) -> Result<bool, SourceError>;
}

impl<T: SpectralSource + ?Sized> SpectralSource for Box<T> {
    fn convert(&mut self, raw: &Path) -> Result<ConvertedRun, SourceError> {
        (**self).convert(raw)
    }
}

impl<T: CollectionModeChecker + ?Sized> CollectionModeChecker for Box<T> {
    fn is_centroided(&mut self, raw: &Path, sample_size: usize) -> Result<bool, SourceError> {
        (**self).is_centroided(raw, sample_size)
    }
}

/// `count` indices spread evenly over `0..len`, always including 0.
///
/// Returns every index when `count >= len`. A `count` of 0 still samples the
/// first index of a non-empty range.
pub fn evenly_spaced_indices(len: usize, count: usize) -> Vec<usize> {
    let count = count.max(1);
    if count >= len {
        return (0..len).collect();
    }
    (0..count).map(|i| i * len / count).collect()
}

/// Checks the centroid flag on scans produced by any [`SpectralSource`]
#[derive(Debug)]
pub struct SpectrumModeChecker<S> {
    source: S,
}

impl<S: SpectralSource> SpectrumModeChecker<S> {
    /// Inspect spectra produced by `source`
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: SpectralSource> CollectionModeChecker for SpectrumModeChecker<S> {
    fn is_centroided(&mut self, raw: &Path, sample_size: usize) -> Result<bool, SourceError> {
        let run = self.source.convert(raw)?;
        if run.is_empty() {
            return Err(SourceError::Corrupt {
                path: raw.to_path_buf(),
                reason: "no spectra".to_string(),
            });
        }

        let spectra = run.spectra();
        let centroided = evenly_spaced_indices(spectra.len(), sample_size)
            .into_iter()
            .all(|i| spectra[i].centroided);
        Ok(centroided)
    }
}
