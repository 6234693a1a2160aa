use crate::spectra::Spectrum;

/// One `<spectrum>` element, reduced to the fields extraction reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MzMLSpectrum {
    /// `index` attribute, or the position in the list when absent
    pub index: usize,
    /// Native ID, e.g. `controllerType=0 controllerNumber=1 scan=42`
    pub id: String,
    /// `defaultArrayLength`; decoded arrays must match it
    pub default_array_length: usize,
    /// MS level; 0 when the file does not say
    pub ms_level: u8,
    /// Centroid (true) or profile (false)
    pub centroided: bool,
    /// Scan polarity, `Some(true)` for positive
    pub positive: Option<bool>,
    /// Scan start time in minutes
    pub scan_start: Option<f64>,
    /// Total ion current
    pub total_ion_current: Option<f64>,
    /// First selected ion of the first precursor
    pub selected_ion_mz: Option<f64>,
    /// Isolation window target of the first precursor
    pub isolation_target_mz: Option<f64>,
    /// Decoded m/z array
    pub mz: Vec<f64>,
    /// Decoded intensity array
    pub intensity: Vec<f64>,
}

impl MzMLSpectrum {
    /// Precursor m/z, preferring the selected ion over the isolation target
    pub fn precursor_mz(&self) -> Option<f64> {
        self.selected_ion_mz.or(self.isolation_target_mz)
    }

    /// Convert into the converter-neutral [`Spectrum`].
    ///
    /// A missing scan start time becomes NaN so that the scan never falls
    /// inside a retention-time window.
    pub fn into_spectrum(self) -> Spectrum {
        Spectrum {
            index: self.index,
            ms_level: self.ms_level,
            retention_time: self.scan_start.unwrap_or(f64::NAN),
            precursor_mz: self.precursor_mz(),
            mz: self.mz,
            intensity: self.intensity,
            centroided: self.centroided,
            total_ion_current: self.total_ion_current,
        }
    }
}
