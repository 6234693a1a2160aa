//! The PSI-MS and UO terms that change how a spectrum is read.
//!
//! Everything else in a `<cvParam>` is ignored.

/// Recognized controlled-vocabulary terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvTerm {
    /// MS:1000511
    MsLevel,
    /// MS:1000127
    CentroidSpectrum,
    /// MS:1000128
    ProfileSpectrum,
    /// MS:1000130
    PositiveScan,
    /// MS:1000129
    NegativeScan,
    /// MS:1000016
    ScanStartTime,
    /// MS:1000285
    TotalIonCurrent,
    /// MS:1000744
    SelectedIonMz,
    /// MS:1000827
    IsolationTargetMz,
    /// MS:1000521
    Float32,
    /// MS:1000523
    Float64,
    /// MS:1000574
    ZlibCompression,
    /// MS:1000576
    NoCompression,
    /// MS:1000514
    MzArray,
    /// MS:1000515
    IntensityArray,
}

impl CvTerm {
    const ALL: [CvTerm; 15] = [
        CvTerm::MsLevel,
        CvTerm::CentroidSpectrum,
        CvTerm::ProfileSpectrum,
        CvTerm::PositiveScan,
        CvTerm::NegativeScan,
        CvTerm::ScanStartTime,
        CvTerm::TotalIonCurrent,
        CvTerm::SelectedIonMz,
        CvTerm::IsolationTargetMz,
        CvTerm::Float32,
        CvTerm::Float64,
        CvTerm::ZlibCompression,
        CvTerm::NoCompression,
        CvTerm::MzArray,
        CvTerm::IntensityArray,
    ];

    /// PSI-MS accession
    pub fn accession(self) -> &'static str {
        match self {
            CvTerm::MsLevel => "MS:1000511",
            CvTerm::CentroidSpectrum => "MS:1000127",
            CvTerm::ProfileSpectrum => "MS:1000128",
            CvTerm::PositiveScan => "MS:1000130",
            CvTerm::NegativeScan => "MS:1000129",
            CvTerm::ScanStartTime => "MS:1000016",
            CvTerm::TotalIonCurrent => "MS:1000285",
            CvTerm::SelectedIonMz => "MS:1000744",
            CvTerm::IsolationTargetMz => "MS:1000827",
            CvTerm::Float32 => "MS:1000521",
            CvTerm::Float64 => "MS:1000523",
            CvTerm::ZlibCompression => "MS:1000574",
            CvTerm::NoCompression => "MS:1000576",
            CvTerm::MzArray => "MS:1000514",
            CvTerm::IntensityArray => "MS:1000515",
        }
    }

    /// Term for an accession, if it is one the reader cares about
    pub fn from_accession(accession: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.accession() == accession)
    }
}

/// Units a scan start time can be reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    /// UO:0000010; also assumed when no unit is given
    #[default]
    Second,
    /// UO:0000031
    Minute,
    /// UO:0000028
    Millisecond,
}

impl TimeUnit {
    /// Unit named by a `unitAccession` attribute
    pub fn from_accession(accession: Option<&str>) -> Self {
        match accession {
            Some("UO:0000031") => TimeUnit::Minute,
            Some("UO:0000028") => TimeUnit::Millisecond,
            _ => TimeUnit::Second,
        }
    }

    /// `value` in this unit, expressed in minutes
    pub fn to_minutes(self, value: f64) -> f64 {
        match self {
            TimeUnit::Second => value / 60.0,
            TimeUnit::Minute => value,
            TimeUnit::Millisecond => value / 60_000.0,
        }
    }
}

/// A `<cvParam>` with a recognized accession
#[derive(Debug, Clone, PartialEq)]
pub struct CvParam {
    /// The term
    pub term: CvTerm,
    /// `value` attribute
    pub value: Option<String>,
    /// Unit from `unitAccession`
    pub unit: TimeUnit,
}

impl CvParam {
    /// Numeric value, when present and parseable
    pub fn number(&self) -> Option<f64> {
        self.value.as_deref()?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessions_round_trip() {
        for term in CvTerm::ALL {
            assert_eq!(CvTerm::from_accession(term.accession()), Some(term));
        }
        assert_eq!(CvTerm::from_accession("MS:1000580"), None);
    }

    #[test]
    fn test_scan_time_units() {
        assert_eq!(TimeUnit::from_accession(Some("UO:0000010")).to_minutes(120.0), 2.0);
        assert_eq!(TimeUnit::from_accession(Some("UO:0000031")).to_minutes(2.5), 2.5);
        assert_eq!(TimeUnit::from_accession(Some("UO:0000028")).to_minutes(90_000.0), 1.5);
        assert_eq!(TimeUnit::from_accession(None).to_minutes(30.0), 0.5);
    }

    #[test]
    fn test_number() {
        let level = CvParam {
            term: CvTerm::MsLevel,
            value: Some(" 2 ".to_string()),
            unit: TimeUnit::Second,
        };
        assert_eq!(level.number(), Some(2.0));

        let flag = CvParam {
            term: CvTerm::CentroidSpectrum,
            value: None,
            unit: TimeUnit::Second,
        };
        assert_eq!(flag.number(), None);
    }
}
