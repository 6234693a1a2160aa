//! Row types for the three result tables.
//!
//! Absent signal is stored as `NaN` in every numeric column, never as a
//! missing row.

use serde::{Deserialize, Serialize};

use crate::filename::{Polarity, SampleCategory};

/// Column order of the MS1 peak table
pub const PEAK_COLUMNS: &[&str] = &[
    "file_name",
    "run_num",
    "file_category",
    "polarity",
    "compound_name",
    "retention_time",
    "theoretical_mz",
    "observed_mz",
    "ppm_error",
    "observed_intensity",
];

/// Column order of the MS1 TIC table
pub const TIC_COLUMNS: &[&str] = &[
    "file_name",
    "run_num",
    "file_category",
    "polarity",
    "group",
    "retention_times",
    "tic_intensities",
];

/// Column order of the MS2 match table
pub const MS2_COLUMNS: &[&str] = &[
    "file_name",
    "run_num",
    "file_category",
    "polarity",
    "theoretical_mz",
    "observed_mz",
    "ppm_error",
    "observed_intensity",
];

/// Apex of one compound's extracted-ion chromatogram in one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    /// File stem
    pub file_name: String,
    /// Run number from the filename
    pub run_num: u32,
    /// Sample category
    pub file_category: SampleCategory,
    /// Polarity the compound was extracted in
    pub polarity: Polarity,
    /// Atlas compound
    pub compound_name: String,
    /// Apex retention time (minutes)
    pub retention_time: f64,
    /// Atlas m/z for this polarity
    pub theoretical_mz: f64,
    /// Apex m/z
    pub observed_mz: f64,
    /// (theoretical - observed) / theoretical * 1e6
    pub ppm_error: f64,
    /// Apex intensity
    pub observed_intensity: f64,
}

/// Full MS1 total-ion-current trace of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicRecord {
    /// File stem
    pub file_name: String,
    /// Run number from the filename
    pub run_num: u32,
    /// Sample category
    pub file_category: SampleCategory,
    /// File polarity
    pub polarity: Polarity,
    /// Sample group
    pub group: String,
    /// Scan times (minutes)
    #[serde(with = "trace")]
    pub retention_times: Vec<f64>,
    /// TIC per scan
    #[serde(with = "trace")]
    pub tic_intensities: Vec<f64>,
}

/// One diagnostic fragment looked up in the representative MS2 scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ms2MatchRecord {
    /// File stem
    pub file_name: String,
    /// Run number from the filename
    pub run_num: u32,
    /// Sample category
    pub file_category: SampleCategory,
    /// Panel polarity
    pub polarity: Polarity,
    /// Diagnostic fragment m/z
    pub theoretical_mz: f64,
    /// Nearest matching peak m/z, or NaN
    pub observed_mz: f64,
    /// ppm error of the match, or NaN
    pub ppm_error: f64,
    /// Intensity of the match, or NaN
    pub observed_intensity: f64,
}

/// Rows produced by one file, appended to the store in one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBatch {
    /// MS1 peak rows
    pub peaks: Vec<PeakRecord>,
    /// MS1 TIC rows
    pub tics: Vec<TicRecord>,
    /// MS2 match rows
    pub ms2_matches: Vec<Ms2MatchRecord>,
}

impl ResultBatch {
    /// Whether all three tables are empty
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty() && self.tics.is_empty() && self.ms2_matches.is_empty()
    }

    /// Move every row of `other` into `self`
    pub fn extend(&mut self, other: ResultBatch) {
        self.peaks.extend(other.peaks);
        self.tics.extend(other.tics);
        self.ms2_matches.extend(other.ms2_matches);
    }
}

/// Space-separated number lists in a single CSV cell.
///
/// `Display` for f64 prints the shortest round-trip form (`NaN`, `inf` included).
mod trace {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        serializer.serialize_str(&joined)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.split_whitespace()
            .map(|v| v.parse::<f64>().map_err(de::Error::custom))
            .collect()
    }
}
