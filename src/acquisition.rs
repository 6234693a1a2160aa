//! Acquisition file entity: a path, its filename classification, and the
//! spectral summaries attached while the file is being processed.

use std::path::{Path, PathBuf};

use crate::extraction::{extract_ms1, extract_ms1_tic, Ms1Arrays, TicTrace};
use crate::filename::{classify, FileClassification, FilenameError, Polarity, SampleCategory};
use crate::spectra::Spectrum;

/// One acquisition file being processed.
///
/// The classification is fixed at construction. MS1 arrays and the TIC trace
/// are attached from converted spectra and released once records are built.
#[derive(Debug, Clone)]
pub struct AcquisitionFile {
    path: PathBuf,
    classification: FileClassification,
    ms1: Option<Ms1Arrays>,
    tic: Option<TicTrace>,
}

impl AcquisitionFile {
    /// Classify the file name of `path`
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, FilenameError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let classification = classify(&file_name)?;
        Ok(Self::with_classification(path, classification))
    }

    /// Use a classification produced elsewhere
    pub fn with_classification(path: impl Into<PathBuf>, classification: FileClassification) -> Self {
        Self {
            path: path.into(),
            classification,
            ms1: None,
            tic: None,
        }
    }

    /// File path (identity)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name (file stem)
    pub fn name(&self) -> &str {
        &self.classification.name
    }

    /// Full classification
    pub fn classification(&self) -> &FileClassification {
        &self.classification
    }

    /// Polarity descriptor
    pub fn polarity(&self) -> Polarity {
        self.classification.polarity
    }

    /// Sample category
    pub fn category(&self) -> SampleCategory {
        self.classification.category
    }

    /// Run number
    pub fn run_number(&self) -> u32 {
        self.classification.run_number
    }

    /// Whether MS2 scans are expected
    pub fn has_ms2(&self) -> bool {
        self.classification.ms_level.has_ms2()
    }

    /// Whether this is an injection blank
    pub fn is_blank(&self) -> bool {
        self.classification.is_blank()
    }

    /// Build the MS1 arrays and TIC trace from converted spectra
    pub fn attach_spectra(&mut self, spectra: &[Spectrum]) {
        self.ms1 = Some(extract_ms1(spectra));
        self.tic = Some(extract_ms1_tic(spectra));
    }

    /// MS1 arrays, if attached
    pub fn ms1(&self) -> Option<&Ms1Arrays> {
        self.ms1.as_ref()
    }

    /// TIC trace, if attached
    pub fn tic(&self) -> Option<&TicTrace> {
        self.tic.as_ref()
    }

    /// Drop the attached arrays
    pub fn release_spectra(&mut self) {
        self.ms1 = None;
        self.tic = None;
    }
}
