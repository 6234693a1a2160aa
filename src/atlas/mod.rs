//! # Compound Atlas
//!
//! The target list for MS1 extraction: per compound, the theoretical m/z in
//! each polarity and the ideal retention time (minutes). Atlases are plain CSV
//! files, one per chromatography:
//!
//! ```text
//! compound_name,pos_mz,neg_mz,ideal_rt,intensity_threshold,check_signal
//! "13C,15N-Phenylalanine",176.1135,174.0989,9.0,5000000,true
//! ```
//!
//! `intensity_threshold` and `check_signal` may be omitted. A compound seen in
//! one polarity only leaves the other m/z cell empty.

mod error;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::filename::{Chromatography, Polarity};

pub use error::AtlasError;

/// One target compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasEntry {
    /// Compound name
    pub compound_name: String,
    /// Theoretical m/z in positive mode
    #[serde(alias = "POS_mz")]
    pub pos_mz: Option<f64>,
    /// Theoretical m/z in negative mode
    #[serde(alias = "NEG_mz")]
    pub neg_mz: Option<f64>,
    /// Expected apex retention time in minutes
    pub ideal_rt: f64,
    /// Minimum acceptable apex intensity
    #[serde(default)]
    pub intensity_threshold: Option<f64>,
    /// Whether to warn when the apex falls below the threshold
    #[serde(default)]
    pub check_signal: Option<bool>,
}

impl AtlasEntry {
    /// Entry with both m/z values and no threshold
    pub fn new(name: impl Into<String>, pos_mz: f64, neg_mz: f64, ideal_rt: f64) -> Self {
        Self {
            compound_name: name.into(),
            pos_mz: Some(pos_mz),
            neg_mz: Some(neg_mz),
            ideal_rt,
            intensity_threshold: None,
            check_signal: None,
        }
    }

    /// Attach an intensity threshold and enable the signal check
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.intensity_threshold = Some(threshold);
        self.check_signal = Some(true);
        self
    }

    /// Theoretical m/z for a single polarity; `None` for FPS or an absent value
    pub fn mz_for(&self, polarity: Polarity) -> Option<f64> {
        match polarity {
            Polarity::Pos => self.pos_mz,
            Polarity::Neg => self.neg_mz,
            Polarity::Fps => None,
        }
    }

    /// Threshold to enforce, if signal checking is on
    pub fn signal_threshold(&self) -> Option<f64> {
        match self.check_signal {
            Some(false) => None,
            _ => self.intensity_threshold,
        }
    }

    fn validate(&self) -> Result<(), AtlasError> {
        let invalid = |reason: &str| AtlasError::InvalidEntry {
            compound: self.compound_name.clone(),
            reason: reason.to_string(),
        };
        if self.pos_mz.is_none() && self.neg_mz.is_none() {
            return Err(invalid("no theoretical m/z for either polarity"));
        }
        let positive = |v: Option<f64>| v.map_or(true, |mz| mz.is_finite() && mz > 0.0);
        if !positive(self.pos_mz) || !positive(self.neg_mz) {
            return Err(invalid("theoretical m/z must be positive"));
        }
        if !self.ideal_rt.is_finite() {
            return Err(invalid("ideal_rt is not a number"));
        }
        Ok(())
    }
}

/// Ordered list of target compounds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundAtlas {
    entries: Vec<AtlasEntry>,
}

impl CompoundAtlas {
    /// Atlas from entries, validating each
    pub fn new(entries: Vec<AtlasEntry>) -> Result<Self, AtlasError> {
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self { entries })
    }

    /// Isotope-labelled internal standards spiked into every sample
    pub fn builtin_internal_standards() -> Self {
        let threshold = 5.0e6;
        Self {
            entries: vec![
                AtlasEntry::new("13C,15N-Phenylalanine", 176.1135, 174.0989, 9.0)
                    .with_threshold(threshold),
                AtlasEntry::new("ABMBA", 229.9811, 227.9665, 5.0).with_threshold(threshold),
                AtlasEntry::new("13C,15N-Tryptophan", 218.1281, 216.1136, 10.0)
                    .with_threshold(threshold),
                AtlasEntry::new("13C2,15N3-Cytosine", 117.0484, 115.0338, 5.0)
                    .with_threshold(threshold),
            ],
        }
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AtlasError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let entries = csv_reader
            .deserialize()
            .collect::<Result<Vec<AtlasEntry>, _>>()?;
        Self::new(entries)
    }

    /// Load an atlas CSV file
    pub fn from_path(path: &Path) -> Result<Self, AtlasError> {
        let atlas = Self::from_reader(File::open(path)?)?;
        if atlas.is_empty() {
            return Err(AtlasError::Empty(path.to_path_buf()));
        }
        Ok(atlas)
    }

    /// Compounds in atlas order
    pub fn entries(&self) -> &[AtlasEntry] {
        &self.entries
    }

    /// Number of compounds
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the atlas is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Supplies the atlas for a session's chromatography
pub trait AtlasLoader {
    /// Load the atlas for `chromatography`
    fn load(&self, chromatography: Chromatography) -> Result<CompoundAtlas, AtlasError>;
}

impl AtlasLoader for CompoundAtlas {
    fn load(&self, _chromatography: Chromatography) -> Result<CompoundAtlas, AtlasError> {
        Ok(self.clone())
    }
}

/// Reads `default_{c18,hilic}_atlas.csv` from a directory, falling back to the
/// built-in internal standards when the file is absent
#[derive(Debug, Clone)]
pub struct AtlasDirectory {
    dir: PathBuf,
}

impl AtlasDirectory {
    /// Look for atlases in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the atlas for `chromatography`
    pub fn atlas_path(&self, chromatography: Chromatography) -> PathBuf {
        self.dir
            .join(format!("default_{}_atlas.csv", chromatography.as_str()))
    }
}

impl AtlasLoader for AtlasDirectory {
    fn load(&self, chromatography: Chromatography) -> Result<CompoundAtlas, AtlasError> {
        let path = self.atlas_path(chromatography);
        if path.is_file() {
            info!("Loading {} atlas from {}", chromatography, path.display());
            CompoundAtlas::from_path(&path)
        } else {
            info!(
                "No atlas at {}; using built-in internal standards",
                path.display()
            );
            Ok(CompoundAtlas::builtin_internal_standards())
        }
    }
}
