//! # MS2 Diagnostic Matcher
//!
//! Collects the MS2 scans fragmenting a reference precursor, keeps the one
//! with the largest summed intensity, and looks up a fixed panel of
//! diagnostic fragment ions in it. Every ion gets exactly one row per file,
//! found or not.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionFile;
use crate::extraction::{ppm_error, ExtractionConfig};
use crate::filename::Polarity;
use crate::spectra::Spectrum;
use crate::store::Ms2MatchRecord;

/// Peak list of one MS2 scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ms2Scan {
    /// Scan time (minutes)
    pub retention_time: f64,
    /// Fragment m/z
    pub mz: Vec<f64>,
    /// Fragment intensity
    pub intensity: Vec<f64>,
}

impl Ms2Scan {
    /// Total ion signal of the scan
    pub fn summed_intensity(&self) -> f64 {
        self.intensity.iter().sum()
    }
}

/// Every MS2 scan whose selected precursor lies within `mz_tolerance` of `precursor_mz`
pub fn extract_ms2(spectra: &[Spectrum], precursor_mz: f64, mz_tolerance: f64) -> Vec<Ms2Scan> {
    spectra
        .iter()
        .filter(|s| s.ms_level == 2)
        .filter(|s| {
            s.precursor_mz
                .is_some_and(|p| (p - precursor_mz).abs() <= mz_tolerance)
        })
        .map(|s| Ms2Scan {
            retention_time: s.retention_time,
            mz: s.mz.clone(),
            intensity: s.intensity.clone(),
        })
        .collect()
}

/// Scan with the greatest summed intensity; the first one wins ties
pub fn select_representative_scan(candidates: &[Ms2Scan]) -> Option<&Ms2Scan> {
    let mut best: Option<(&Ms2Scan, f64)> = None;
    for scan in candidates {
        let total = scan.summed_intensity();
        if best.map_or(true, |(_, b)| total > b) {
            best = Some((scan, total));
        }
    }
    best.map(|(scan, _)| scan)
}

/// Result of looking up one diagnostic ion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonMatch {
    /// Diagnostic fragment m/z
    pub theoretical_mz: f64,
    /// Nearest peak m/z, or NaN
    pub observed_mz: f64,
    /// ppm error, or NaN
    pub ppm_error: f64,
    /// Intensity of the nearest peak, or NaN
    pub observed_intensity: f64,
}

impl IonMatch {
    /// Not-found row for `theoretical_mz`
    pub fn not_found(theoretical_mz: f64) -> Self {
        Self {
            theoretical_mz,
            observed_mz: f64::NAN,
            ppm_error: f64::NAN,
            observed_intensity: f64::NAN,
        }
    }

    /// Whether a peak matched
    pub fn is_found(&self) -> bool {
        !self.observed_mz.is_nan()
    }
}

/// Look up each diagnostic m/z in `scan`.
///
/// Among the peaks within `fragment_tolerance`, the one with m/z nearest the
/// theoretical value is reported (not the most intense). Always returns one
/// entry per ion, in panel order; without a scan every entry is not-found.
pub fn match_diagnostic_ions(
    scan: Option<&Ms2Scan>,
    diagnostic_mzs: &[f64],
    fragment_tolerance: f64,
) -> Vec<IonMatch> {
    diagnostic_mzs
        .iter()
        .map(|&theoretical| match scan {
            Some(scan) => nearest_peak(scan, theoretical, fragment_tolerance),
            None => IonMatch::not_found(theoretical),
        })
        .collect()
}

fn nearest_peak(scan: &Ms2Scan, theoretical: f64, tolerance: f64) -> IonMatch {
    let mut best: Option<(f64, f64, f64)> = None;
    for (&mz, &intensity) in scan.mz.iter().zip(&scan.intensity) {
        let distance = (mz - theoretical).abs();
        if distance.is_nan() || distance > tolerance {
            continue;
        }
        if best.map_or(true, |(d, _, _)| distance < d) {
            best = Some((distance, mz, intensity));
        }
    }

    match best {
        Some((_, mz, intensity)) => IonMatch {
            theoretical_mz: theoretical,
            observed_mz: mz,
            ppm_error: ppm_error(mz, theoretical),
            observed_intensity: intensity,
        },
        None => IonMatch::not_found(theoretical),
    }
}

/// Precursor and fragment ions checked for one polarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPanel {
    /// Polarity the panel applies to
    pub polarity: Polarity,
    /// Precursor m/z
    pub precursor_mz: f64,
    /// Diagnostic fragment m/z values, in report order
    pub diagnostic_ions: Vec<f64>,
}

impl DiagnosticPanel {
    /// 13C,15N-phenylalanine, positive mode
    pub fn positive_default() -> Self {
        Self {
            polarity: Polarity::Pos,
            precursor_mz: 176.1135,
            diagnostic_ions: vec![111.0808, 129.1045, 140.0793, 176.1135],
        }
    }

    /// 13C,15N-phenylalanine, negative mode
    pub fn negative_default() -> Self {
        Self {
            polarity: Polarity::Neg,
            precursor_mz: 174.09893,
            diagnostic_ions: vec![75.01253, 156.07551, 174.09893],
        }
    }

    /// Both default panels
    pub fn defaults() -> Vec<Self> {
        vec![Self::positive_default(), Self::negative_default()]
    }
}

/// MS2 match rows for `file`, one per diagnostic ion of every panel that
/// applies to the file's polarity
pub fn collect_ms2_matches(
    file: &AcquisitionFile,
    spectra: &[Spectrum],
    panels: &[DiagnosticPanel],
    config: &ExtractionConfig,
) -> Vec<Ms2MatchRecord> {
    let mut records = Vec::new();

    for &polarity in file.polarity().variants() {
        for panel in panels.iter().filter(|p| p.polarity == polarity) {
            let scans = extract_ms2(spectra, panel.precursor_mz, config.mz_tolerance);
            let representative = select_representative_scan(&scans);
            debug!(
                "{} {}: {} MS2 scans at precursor {}",
                file.name(),
                polarity,
                scans.len(),
                panel.precursor_mz
            );

            let matches = match_diagnostic_ions(
                representative,
                &panel.diagnostic_ions,
                config.fragment_tolerance,
            );
            records.extend(matches.into_iter().map(|m| Ms2MatchRecord {
                file_name: file.name().to_string(),
                run_num: file.run_number(),
                file_category: file.category(),
                polarity,
                theoretical_mz: m.theoretical_mz,
                observed_mz: m.observed_mz,
                ppm_error: m.ppm_error,
                observed_intensity: m.observed_intensity,
            }));
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms2(precursor: f64, peaks: &[(f64, f64)]) -> Spectrum {
        Spectrum {
            ms_level: 2,
            retention_time: 9.0,
            precursor_mz: Some(precursor),
            mz: peaks.iter().map(|p| p.0).collect(),
            intensity: peaks.iter().map(|p| p.1).collect(),
            centroided: true,
            ..Default::default()
        }
    }

    fn scan(peaks: &[(f64, f64)]) -> Ms2Scan {
        Ms2Scan {
            retention_time: 0.0,
            mz: peaks.iter().map(|p| p.0).collect(),
            intensity: peaks.iter().map(|p| p.1).collect(),
        }
    }

    fn file(polarity: &str, ms_level: &str) -> AcquisitionFile {
        AcquisitionFile::new(format!(
            "20240101_JGI_MD_123456_Proj_MX_20240101_C18_USDAY1_{}_{}_0_QC_Rep1_Opt_Run9.raw",
            polarity, ms_level
        ))
        .unwrap()
    }

    #[test]
    fn test_extract_ms2_filters_precursor() {
        let mut ms1 = ms2(176.1135, &[(1.0, 1.0)]);
        ms1.ms_level = 1;
        let spectra = vec![
            ms2(176.1135, &[(111.0808, 10.0)]),
            ms2(176.1160, &[(111.0808, 20.0)]),
            ms1,
            ms2(176.1140, &[(129.1045, 30.0)]),
        ];
        let scans = extract_ms2(&spectra, 176.1135, 0.0015);
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[1].mz, vec![129.1045]);
    }

    #[test]
    fn test_representative_scan() {
        assert!(select_representative_scan(&[]).is_none());

        let scans = vec![
            scan(&[(1.0, 5.0), (2.0, 5.0)]),
            scan(&[(1.0, 20.0)]),
            scan(&[(3.0, 10.0), (4.0, 10.0)]),
        ];
        let best = select_representative_scan(&scans).unwrap();
        assert_eq!(best.mz, vec![1.0]);
    }

    #[test]
    fn test_nearest_not_most_intense() {
        let s = scan(&[(111.0790, 1000.0), (111.0810, 5.0), (111.0830, 50.0)]);
        let matches = match_diagnostic_ions(Some(&s), &[111.0808], 0.005);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].observed_mz, 111.0810);
        assert_eq!(matches[0].observed_intensity, 5.0);
        assert!(matches[0].ppm_error < 0.0);
    }

    #[test]
    fn test_missing_ion_and_missing_scan() {
        let s = scan(&[(111.0808, 10.0)]);
        let matches = match_diagnostic_ions(Some(&s), &[111.0808, 129.1045], 0.005);
        assert!(matches[0].is_found());
        assert!(!matches[1].is_found());
        assert!(matches[1].observed_intensity.is_nan());

        let none = match_diagnostic_ions(None, &[1.0, 2.0, 3.0], 0.005);
        assert_eq!(none.len(), 3);
        assert!(none.iter().all(|m| !m.is_found()));
    }

    #[test]
    fn test_collect_for_fps_uses_both_panels() {
        let spectra = vec![
            ms2(176.1135, &[(111.0808, 10.0), (176.1136, 4.0)]),
            ms2(174.09893, &[(75.01253, 7.0)]),
        ];
        let panels = DiagnosticPanel::defaults();
        let config = ExtractionConfig::default();

        let records = collect_ms2_matches(&file("FPS", "MS2"), &spectra, &panels, &config);
        assert_eq!(records.len(), 7);
        assert!(records[..4].iter().all(|r| r.polarity == Polarity::Pos));
        assert!(records[4..].iter().all(|r| r.polarity == Polarity::Neg));
        assert_eq!(records[0].observed_intensity, 10.0);
        assert!(records[1].observed_mz.is_nan());
        assert_eq!(records[4].observed_intensity, 7.0);
        assert_eq!(records[0].run_num, 9);
    }

    #[test]
    fn test_collect_without_scans_reports_all_ions() {
        let records = collect_ms2_matches(
            &file("NEG", "MSMS"),
            &[],
            &DiagnosticPanel::defaults(),
            &ExtractionConfig::default(),
        );
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.observed_mz.is_nan() && r.ppm_error.is_nan()));
    }

    proptest! {
        #[test]
        fn prop_one_row_per_ion(
            ions in prop::collection::vec(50.0f64..500.0, 0..8),
            peaks in prop::collection::vec((50.0f64..500.0, 0.0f64..1e6), 0..64),
            has_scan in any::<bool>(),
        ) {
            let s = scan(&peaks);
            let found = match_diagnostic_ions(has_scan.then_some(&s), &ions, 0.5);
            prop_assert_eq!(found.len(), ions.len());
            for (m, &ion) in found.iter().zip(&ions) {
                prop_assert_eq!(m.theoretical_mz, ion);
                if m.is_found() {
                    prop_assert!((m.observed_mz - ion).abs() <= 0.5);
                }
            }
        }
    }
}
