//! # Peak Extraction Engine
//!
//! Flattens MS1 scans into parallel (time, m/z, intensity) arrays, cuts
//! extracted-ion chromatograms out of them and picks the apex.
//!
//! m/z and retention-time windows here are **absolute** (Da and minutes).
//! ppm is only used to report the deviation of an apex from its theoretical
//! m/z, via [`ppm_error`].


use log::{debug, warn};

use crate::acquisition::AcquisitionFile;
use crate::atlas::CompoundAtlas;
use crate::spectra::Spectrum;
use crate::store::{PeakRecord, TicRecord};

/// Default absolute m/z tolerance (Da) for MS1 extraction
pub const DEFAULT_MZ_TOLERANCE: f64 = 0.0015;
/// Default absolute m/z tolerance (Da) for MS2 fragment matching
pub const DEFAULT_FRAGMENT_TOLERANCE: f64 = 0.005;
/// Default half-width of the retention-time window (minutes)
pub const DEFAULT_RT_WINDOW: f64 = 2.0;

/// Tolerances shared by MS1 extraction and MS2 matching
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionConfig {
    /// MS1 and precursor tolerance (Da)
    pub mz_tolerance: f64,
    /// Fragment tolerance (Da)
    pub fragment_tolerance: f64,
    /// Half-width of the RT window around the ideal RT (minutes)
    pub rt_window: f64,
    /// Restrict EICs to the RT window
    pub rt_filter: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mz_tolerance: DEFAULT_MZ_TOLERANCE,
            fragment_tolerance: DEFAULT_FRAGMENT_TOLERANCE,
            rt_window: DEFAULT_RT_WINDOW,
            rt_filter: true,
        }
    }
}

/// Three parallel sequences of MS1 peaks
///
/// Also used for extracted-ion chromatograms, which are subsets of the same shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ms1Arrays {
    /// Scan time of each peak (minutes), repeated for every peak in a scan
    pub times: Vec<f64>,
    /// Peak m/z
    pub mzs: Vec<f64>,
    /// Peak intensity
    pub intensities: Vec<f64>,
}

impl Ms1Arrays {
    /// Empty arrays with room for `capacity` peaks
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity),
            mzs: Vec::with_capacity(capacity),
            intensities: Vec::with_capacity(capacity),
        }
    }

    /// Append one peak
    pub fn push(&mut self, time: f64, mz: f64, intensity: f64) {
        self.times.push(time);
        self.mzs.push(mz);
        self.intensities.push(intensity);
    }

    /// Number of peaks
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether there are no peaks
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate `(time, mz, intensity)` triples
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.times
            .iter()
            .zip(&self.mzs)
            .zip(&self.intensities)
            .map(|((&t, &mz), &i)| (t, mz, i))
    }
}

/// One TIC point per MS1 scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicTrace {
    /// Scan times (minutes)
    pub times: Vec<f64>,
    /// Total ion current per scan
    pub intensities: Vec<f64>,
}

/// Apex of a chromatogram; all fields NaN when nothing was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Apex {
    /// Retention time (minutes)
    pub retention_time: f64,
    /// m/z
    pub mz: f64,
    /// Intensity
    pub intensity: f64,
}

impl Apex {
    /// The absent-signal apex
    pub const NOT_FOUND: Apex = Apex {
        retention_time: f64::NAN,
        mz: f64::NAN,
        intensity: f64::NAN,
    };

    /// Whether a real point was picked
    pub fn is_found(&self) -> bool {
        !self.intensity.is_nan()
    }
}

/// Flatten every MS1 scan into parallel arrays. No filtering.
pub fn extract_ms1(spectra: &[Spectrum]) -> Ms1Arrays {
    let total = spectra
        .iter()
        .filter(|s| s.ms_level == 1)
        .map(Spectrum::peak_count)
        .sum();
    let mut arrays = Ms1Arrays::with_capacity(total);

    for spectrum in spectra.iter().filter(|s| s.ms_level == 1) {
        for (&mz, &intensity) in spectrum.mz.iter().zip(&spectrum.intensity) {
            arrays.push(spectrum.retention_time, mz, intensity);
        }
    }
    arrays
}

/// One (time, TIC) point per MS1 scan
pub fn extract_ms1_tic(spectra: &[Spectrum]) -> TicTrace {
    let (times, intensities) = spectra
        .iter()
        .filter(|s| s.ms_level == 1)
        .map(|s| (s.retention_time, s.tic()))
        .unzip();
    TicTrace { times, intensities }
}

/// Peaks with `|mz - target_mz| <= mz_tolerance` and, when `rt_center` is
/// given, `|time - rt_center| <= rt_window`.
///
/// An empty result means the compound was not observed.
pub fn extracted_ion_chromatogram(
    ms1: &Ms1Arrays,
    target_mz: f64,
    mz_tolerance: f64,
    rt_center: Option<f64>,
    rt_window: f64,
) -> Ms1Arrays {
    let mut eic = Ms1Arrays::default();
    for (time, mz, intensity) in ms1.iter() {
        let dmz = (mz - target_mz).abs();
        if dmz.is_nan() || dmz > mz_tolerance {
            continue;
        }
        if let Some(center) = rt_center {
            let dt = (time - center).abs();
            if dt.is_nan() || dt > rt_window {
                continue;
            }
        }
        eic.push(time, mz, intensity);
    }
    eic
}

/// Point of maximum intensity; ties go to the earliest index.
///
/// Returns [`Apex::NOT_FOUND`] unless some intensity is above zero.
pub fn pick_apex(eic: &Ms1Arrays) -> Apex {
    let mut best: Option<(usize, f64)> = None;
    for (i, &intensity) in eic.intensities.iter().enumerate() {
        if intensity > best.map_or(0.0, |(_, b)| b) {
            best = Some((i, intensity));
        }
    }

    match best {
        Some((i, intensity)) => Apex {
            retention_time: eic.times[i],
            mz: eic.mzs[i],
            intensity,
        },
        None => Apex::NOT_FOUND,
    }
}

/// Mass deviation in ppm: `(theoretical - observed) / theoretical * 1e6`.
///
/// Positive when the observed mass is below theoretical. NaN propagates.
pub fn ppm_error(observed: f64, theoretical: f64) -> f64 {
    (theoretical - observed) / theoretical * 1e6
}

/// One [`PeakRecord`] per atlas compound per polarity variant of `file`.
///
/// FPS files are extracted once against the positive m/z and once against the
/// negative m/z. Compounds without an m/z for a polarity are skipped for it.
pub fn collect_ms1_peaks(
    file: &AcquisitionFile,
    ms1: &Ms1Arrays,
    atlas: &CompoundAtlas,
    config: &ExtractionConfig,
) -> Vec<PeakRecord> {
    let mut records = Vec::new();

    for &polarity in file.polarity().variants() {
        for entry in atlas.entries() {
            let Some(theoretical) = entry.mz_for(polarity) else {
                continue;
            };

            let rt_center = config.rt_filter.then_some(entry.ideal_rt);
            let eic = extracted_ion_chromatogram(
                ms1,
                theoretical,
                config.mz_tolerance,
                rt_center,
                config.rt_window,
            );
            let apex = pick_apex(&eic);
            debug!(
                "{} {} {}: {} EIC points, apex {:?}",
                file.name(),
                polarity,
                entry.compound_name,
                eic.len(),
                apex
            );

            if let Some(threshold) = entry.signal_threshold() {
                if apex.intensity.is_nan() || apex.intensity < threshold {
                    warn!(
                        "{}: {} ({}) intensity {} below threshold {}",
                        file.name(),
                        entry.compound_name,
                        polarity,
                        apex.intensity,
                        threshold
                    );
                }
            }

            records.push(PeakRecord {
                file_name: file.name().to_string(),
                run_num: file.run_number(),
                file_category: file.category(),
                polarity,
                compound_name: entry.compound_name.clone(),
                retention_time: apex.retention_time,
                theoretical_mz: theoretical,
                observed_mz: apex.mz,
                ppm_error: ppm_error(apex.mz, theoretical),
                observed_intensity: apex.intensity,
            });
        }
    }

    records
}

/// The file's TIC trace as a single record
pub fn tic_record(file: &AcquisitionFile, tic: &TicTrace) -> TicRecord {
    TicRecord {
        file_name: file.name().to_string(),
        run_num: file.run_number(),
        file_category: file.category(),
        polarity: file.polarity(),
        group: file.classification().group.clone(),
        retention_times: tic.times.clone(),
        tic_intensities: tic.intensities.clone(),
    }
}
