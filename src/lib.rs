//! # ms-sentry - Acquisition Monitor for LC-MS Quality Control
//!
//! `ms_sentry` watches a directory while a mass spectrometer is acquiring,
//! picks up each finished acquisition file, extracts the apex signal of a set
//! of reference compounds, checks MS2 fragmentation against fixed diagnostic
//! ions, and exports the accumulated tables as snapshots.
//!
//! ## Key Features
//!
//! - **Filename Classification**: Polarity, MS level, sample category, run
//!   number and chromatography are read from the fixed underscore-delimited
//!   naming grammar.
//!
//! - **Peak Extraction**: Extracted-ion chromatograms with m/z tolerance and an
//!   optional retention-time window, apex picking and ppm error. Missing signal
//!   is always a row with `NaN` values, never a missing row.
//!
//! - **MS2 Diagnostics**: Representative scan selection per precursor and
//!   nearest-peak matching of diagnostic fragment ions.
//!
//! - **Incremental Result Store**: Append-only CSV tables per session with an
//!   explicit `initialize`/`teardown` lifecycle.
//!
//! - **Snapshots**: Checkpoint and final exports as CSV, Parquet (ZSTD) and an
//!   optional zip archive, each with a JSON manifest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ms_sentry::prelude::*;
//!
//! let config = MonitorConfig::new("/data/acquisitions");
//! let source = MzMLSpectralSource::direct();
//! let checker = SpectrumModeChecker::new(MzMLSpectralSource::direct());
//! let collaborators = Collaborators::new(
//!     Box::new(source),
//!     Box::new(checker),
//!     Box::new(CompoundAtlas::builtin_internal_standards()),
//! );
//!
//! let mut monitor = Monitor::new(config, collaborators)?;
//! let report = monitor.run()?;
//! println!("{}", report);
//! # Ok::<(), ms_sentry::monitor::MonitorError>(())
//! ```
//!
//! Each snapshot is a directory under the output root:
//! ```text
//! qc_output_5/
//! ├── ms1_data_sheet.csv              # One row per file x compound x polarity
//! ├── ms1_tic_data_sheet.csv          # One TIC trace per file
//! ├── ms2_data_sheet.csv              # One row per file x diagnostic ion
//! ├── file_name_warnings_report.csv
//! ├── *.parquet                       # Columnar copies of the tables
//! └── manifest.json
//! ```
//!
//! ## Architecture
//!
//! - [`filename`]: Naming grammar, classification and validation
//! - [`dataset`]: Pending/analyzed bookkeeping for the watched directory
//! - [`spectra`]: Converter contract and collection-mode checks
//! - [`extraction`]: MS1 arrays, EIC, apex and ppm error
//! - [`ms2`]: MS2 scans and diagnostic ion matching
//! - [`store`]: Per-session result tables
//! - [`export`]: Snapshot writer
//! - [`monitor`]: The control loop

#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod acquisition;
pub mod atlas;
pub mod dataset;
pub mod export;
pub mod extraction;
pub mod filename;
pub mod monitor;
pub mod ms2;
#[cfg(feature = "mzml")]
pub mod mzml;
pub mod spectra;
pub mod store;
#[cfg(feature = "thermo")]
pub mod thermo;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::acquisition::AcquisitionFile;
    pub use crate::atlas::{AtlasDirectory, AtlasEntry, AtlasLoader, CompoundAtlas};
    pub use crate::dataset::{Dataset, PendingFile};
    pub use crate::export::{SnapshotExporter, SnapshotLabel};
    pub use crate::extraction::{
        extracted_ion_chromatogram, pick_apex, ppm_error, Apex, ExtractionConfig, Ms1Arrays,
    };
    pub use crate::filename::{
        classify, Chromatography, FileClassification, FilenameValidator, GrammarValidator,
        Polarity, SampleCategory,
    };
    pub use crate::monitor::{
        Clock, Collaborators, ManualClock, Monitor, MonitorConfig, MonitorOutcome, MonitorReport,
        MonitorState, SystemClock,
    };
    pub use crate::ms2::{match_diagnostic_ions, DiagnosticPanel, IonMatch, Ms2Scan};
    pub use crate::spectra::{
        CollectionModeChecker, ConvertedRun, SourceError, SpectralSource, Spectrum,
        SpectrumModeChecker,
    };
    pub use crate::store::{Ms2MatchRecord, PeakRecord, ResultBatch, ResultStore, TicRecord};

    #[cfg(feature = "mzml")]
    pub use crate::mzml::{ConverterCommand, MzMLSpectralSource};

    #[cfg(feature = "thermo")]
    pub use crate::thermo::ThermoModeChecker;
}
