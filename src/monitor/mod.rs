//! # Acquisition Monitor
//!
//! The control loop that watches a source directory while an instrument is
//! acquiring, processes each file once it is old enough, and exports the
//! accumulated results.
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 ▼                          │
//!   WaitingForFiles ──► AgeGating ──► ProcessingFile ──► CheckpointExport
//!                                        │    │
//!                                        │    └──► Aborted
//!                                        ▼
//!                                   FinalExport ──► Done
//! ```
//!
//! Each call to [`Monitor::step`] performs exactly one transition. Time and
//! sleeping go through a [`Clock`], so tests drive the loop without real delays.

mod clock;
mod config;
mod error;


use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};
use uuid::Uuid;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    MonitorConfig, DEFAULT_AGE_MARGIN, DEFAULT_CENTROID_SAMPLE_SIZE, DEFAULT_MIN_FILE_AGE,
    DEFAULT_POLL_INTERVAL,
};
pub use error::MonitorError;

use crate::acquisition::AcquisitionFile;
use crate::atlas::{AtlasLoader, CompoundAtlas};
use crate::dataset::Dataset;
use crate::export::{SnapshotExporter, SnapshotLabel};
use crate::extraction::{collect_ms1_peaks, tic_record, ExtractionConfig};
use crate::filename::{
    write_errors_report, write_warnings_report, FilenameMessages, FilenameValidator,
    GrammarValidator,
};
use crate::ms2::{collect_ms2_matches, DiagnosticPanel};
use crate::spectra::{CollectionModeChecker, SpectralSource, Spectrum};
use crate::store::{ResultBatch, ResultStore};

/// Errors report written to the source directory when startup validation fails
pub const ERRORS_REPORT: &str = "file_name_errors_report.csv";
/// Warnings report written next to it
pub const WARNINGS_REPORT: &str = "file_name_warnings_report.csv";

/// States of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorState {
    /// Nothing pending; sleeping before the next directory poll
    WaitingForFiles,
    /// The youngest pending file is too young; sleeping until it ages
    AgeGating,
    /// One file was processed, skipped or failed
    ProcessingFile,
    /// A checkpoint snapshot was written
    CheckpointExport,
    /// The final snapshot was written and the store torn down
    FinalExport,
    /// Session finished
    Done,
    /// Session stopped on a fatal condition
    Aborted,
}

impl MonitorState {
    /// Whether the loop has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, MonitorState::Done | MonitorState::Aborted)
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::WaitingForFiles => "WAITING_FOR_FILES",
            MonitorState::AgeGating => "AGE_GATING",
            MonitorState::ProcessingFile => "PROCESSING_FILE",
            MonitorState::CheckpointExport => "CHECKPOINT_EXPORT",
            MonitorState::FinalExport => "FINAL_EXPORT",
            MonitorState::Done => "DONE",
            MonitorState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Still running
    InProgress,
    /// Final export written
    Done,
    /// Stopped without a final export
    Aborted {
        /// File that triggered the abort
        file: PathBuf,
        /// Human-readable reason
        reason: String,
    },
}

/// Summary of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// Session identifier (also in every manifest)
    pub session_id: Uuid,
    /// How the session ended
    pub outcome: MonitorOutcome,
    /// Checkpoint snapshot directories, in order
    pub checkpoints: Vec<PathBuf>,
    /// Final snapshot directory
    pub final_export: Option<PathBuf>,
    /// Files extracted and appended
    pub processed: Vec<PathBuf>,
    /// Blank files skipped
    pub skipped: Vec<PathBuf>,
    /// Files whose conversion failed
    pub failed: Vec<PathBuf>,
}

impl MonitorReport {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            outcome: MonitorOutcome::InProgress,
            checkpoints: Vec::new(),
            final_export: None,
            processed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Whether the session ended in an abort
    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, MonitorOutcome::Aborted { .. })
    }
}

impl fmt::Display for MonitorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed, {} checkpoints",
            self.processed.len(),
            self.skipped.len(),
            self.failed.len(),
            self.checkpoints.len()
        )
    }
}

/// External capabilities the monitor depends on
pub struct Collaborators {
    /// Converts acquisition files into spectra
    pub source: Box<dyn SpectralSource>,
    /// Verifies centroid acquisition
    pub checker: Box<dyn CollectionModeChecker>,
    /// Supplies the compound atlas
    pub atlas: Box<dyn AtlasLoader>,
    /// Validates file names at startup
    pub validator: Box<dyn FilenameValidator>,
    /// Time source
    pub clock: Box<dyn Clock>,
}

impl Collaborators {
    /// The given capabilities with the grammar validator and the system clock
    pub fn new(
        source: Box<dyn SpectralSource>,
        checker: Box<dyn CollectionModeChecker>,
        atlas: Box<dyn AtlasLoader>,
    ) -> Self {
        Self {
            source,
            checker,
            atlas,
            validator: Box::new(GrammarValidator),
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the filename validator
    pub fn with_validator(mut self, validator: Box<dyn FilenameValidator>) -> Self {
        self.validator = validator;
        self
    }
}

/// Rows for one converted file: MS1 peaks for every atlas compound, the TIC
/// trace, and MS2 diagnostic matches when the file carries MS2 scans
pub fn analyze_spectra(
    file: &mut AcquisitionFile,
    spectra: &[Spectrum],
    atlas: &CompoundAtlas,
    extraction: &ExtractionConfig,
    panels: &[DiagnosticPanel],
) -> ResultBatch {
    file.attach_spectra(spectra);

    let mut batch = ResultBatch::default();
    let file_ref: &AcquisitionFile = file;
    if let Some(ms1) = file_ref.ms1() {
        batch.peaks = collect_ms1_peaks(file_ref, ms1, atlas, extraction);
    }
    if let Some(tic) = file_ref.tic() {
        batch.tics.push(tic_record(file_ref, tic));
    }
    if file_ref.has_ms2() {
        batch.ms2_matches = collect_ms2_matches(file_ref, spectra, panels, extraction);
    }

    file.release_spectra();
    batch
}

/// The acquisition monitor
pub struct Monitor {
    config: MonitorConfig,
    dataset: Dataset,
    store: Option<ResultStore>,
    exporter: SnapshotExporter,
    source: Box<dyn SpectralSource>,
    checker: Box<dyn CollectionModeChecker>,
    atlas_loader: Box<dyn AtlasLoader>,
    clock: Box<dyn Clock>,
    atlas: Option<CompoundAtlas>,
    warnings: Vec<FilenameMessages>,
    target: usize,
    since_checkpoint: usize,
    state: MonitorState,
    report: MonitorReport,
}

impl Monitor {
    /// List the source directory, validate file names and open the result store.
    ///
    /// When validation reports errors, both reports are written to the source
    /// directory and [`MonitorError::FilenameErrors`] is returned unless
    /// `ignore_filename_errors` is set.
    pub fn new(config: MonitorConfig, collaborators: Collaborators) -> Result<Self, MonitorError> {
        let dataset = Dataset::new(&config.source_dir, &config.extension)?;

        let messages = dataset.validate_filenames(collaborators.validator.as_ref());
        let error_count = messages.iter().filter(|m| m.has_errors()).count();
        if error_count > 0 {
            let errors_path = config.source_dir.join(ERRORS_REPORT);
            write_errors_report(&errors_path, &messages)?;
            write_warnings_report(&config.source_dir.join(WARNINGS_REPORT), &messages)?;
            error!("Filename errors detected in {} files", error_count);

            if !config.ignore_filename_errors {
                return Err(MonitorError::FilenameErrors {
                    count: error_count,
                    report: errors_path,
                });
            }
            warn!("Ignoring filename errors");
        }

        let target = config.target_files.unwrap_or(dataset.pending().len());

        let mut store = ResultStore::new(&config.store_root);
        store.initialize()?;
        let session_id = store.session_id();

        let exporter = SnapshotExporter::new(config.output_root(), session_id)
            .with_parquet(config.write_parquet)
            .with_archive(config.archive);

        info!(
            "Monitoring {} ({} pending, target {})",
            config.source_dir.display(),
            dataset.pending().len(),
            target
        );

        Ok(Self {
            config,
            dataset,
            store: Some(store),
            exporter,
            source: collaborators.source,
            checker: collaborators.checker,
            atlas_loader: collaborators.atlas,
            clock: collaborators.clock,
            atlas: None,
            warnings: messages,
            target,
            since_checkpoint: 0,
            state: MonitorState::WaitingForFiles,
            report: MonitorReport::new(session_id),
        })
    }

    /// Current state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Number of files the session will analyze
    pub fn target(&self) -> usize {
        self.target
    }

    /// Dataset bookkeeping
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Filename validation results gathered at startup
    pub fn filename_messages(&self) -> &[FilenameMessages] {
        &self.warnings
    }

    /// The result store, until it is torn down
    pub fn store(&self) -> Option<&ResultStore> {
        self.store.as_ref()
    }

    /// Report of the session so far
    pub fn report(&self) -> MonitorReport {
        self.report.clone()
    }

    /// Step until `Done` or `Aborted`
    pub fn run(&mut self) -> Result<MonitorReport, MonitorError> {
        self.log_progress();
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.report())
    }

    /// Perform one transition and return the state entered.
    ///
    /// An infrastructure error ends the session: the store is torn down, the
    /// outcome becomes `Aborted` and the error is returned.
    pub fn step(&mut self) -> Result<MonitorState, MonitorError> {
        match self.transition() {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                let file = self
                    .dataset
                    .oldest_pending()
                    .map(|f| f.path.clone())
                    .unwrap_or_else(|| self.dataset.root().to_path_buf());
                let teardown = self.abort(file, e.to_string());
                self.state = MonitorState::Aborted;
                teardown?;
                Err(e)
            }
        }
    }

    fn transition(&mut self) -> Result<MonitorState, MonitorError> {
        let next = self.next_state()?;
        debug!("{} -> {}", self.state, next);

        Ok(match next {
            MonitorState::WaitingForFiles => self.wait_for_files()?,
            MonitorState::AgeGating => self.wait_for_age()?,
            MonitorState::ProcessingFile => self.process_next_file()?,
            MonitorState::CheckpointExport => self.checkpoint_export()?,
            MonitorState::FinalExport => self.final_export()?,
            MonitorState::Done => {
                if self.report.outcome == MonitorOutcome::InProgress {
                    info!("Done! {}", self.report);
                    self.report.outcome = MonitorOutcome::Done;
                }
                MonitorState::Done
            }
            MonitorState::Aborted => MonitorState::Aborted,
        })
    }

    fn next_state(&self) -> Result<MonitorState, MonitorError> {
        Ok(match self.state {
            MonitorState::Done | MonitorState::Aborted => self.state,
            MonitorState::FinalExport => MonitorState::Done,
            _ if self.checkpoint_due() => MonitorState::CheckpointExport,
            _ if self.dataset.analyzed_count() >= self.target => MonitorState::FinalExport,
            _ if self.dataset.pending().is_empty() => MonitorState::WaitingForFiles,
            _ if self.remaining_age()?.is_some() => MonitorState::AgeGating,
            _ => MonitorState::ProcessingFile,
        })
    }

    fn checkpoint_due(&self) -> bool {
        matches!(self.config.export_interval, Some(n) if n > 0 && self.since_checkpoint >= n)
    }

    /// Time until the youngest pending file reaches the minimum age.
    ///
    /// Modification times are read from disk on every call, so a file the
    /// instrument is still writing keeps the gate closed.
    fn remaining_age(&self) -> Result<Option<Duration>, MonitorError> {
        let Some(age) = self.dataset.youngest_pending_age(self.clock.now())? else {
            return Ok(None);
        };
        Ok(self
            .config
            .min_file_age
            .checked_sub(age)
            .filter(|d| !d.is_zero()))
    }

    fn wait_for_files(&mut self) -> Result<MonitorState, MonitorError> {
        if self.state != MonitorState::WaitingForFiles {
            info!("Waiting for new files in {}", self.dataset.root().display());
        }
        self.clock.sleep(self.config.poll_interval);
        self.dataset.refresh()?;
        Ok(MonitorState::WaitingForFiles)
    }

    fn wait_for_age(&mut self) -> Result<MonitorState, MonitorError> {
        if let Some(remaining) = self.remaining_age()? {
            let wait = remaining + self.config.age_margin;
            info!(
                "Newest file is younger than {} min; waiting {} s",
                self.config.min_file_age.as_secs() / 60,
                wait.as_secs()
            );
            self.clock.sleep(wait);
        }
        Ok(MonitorState::AgeGating)
    }

    fn process_next_file(&mut self) -> Result<MonitorState, MonitorError> {
        let Some(next) = self.dataset.oldest_pending() else {
            return Ok(MonitorState::WaitingForFiles);
        };
        let path = next.path.clone();

        let mut file = match AcquisitionFile::new(&path) {
            Ok(file) => file,
            Err(e) => return self.abort(path, format!("Filename could not be classified: {}", e)),
        };

        if self.config.skip_blanks && file.is_blank() {
            info!("Skipping blank {}", file.name());
            self.finish_file(&path)?;
            self.report.skipped.push(path);
            return Ok(MonitorState::ProcessingFile);
        }

        match self
            .checker
            .is_centroided(&path, self.config.centroid_sample_size)
        {
            Ok(true) => {}
            Ok(false) => {
                let reason = format!("Data collected in {} is not centroid, check method", file.name());
                return self.abort(path, reason);
            }
            Err(e) => {
                let reason = format!(
                    "Unable to determine collection method, check that {} is not truncated or corrupt: {}",
                    file.name(),
                    e
                );
                return self.abort(path, reason);
            }
        }

        let atlas = match self.atlas.take() {
            Some(atlas) => atlas,
            None => {
                let loaded = self
                    .dataset
                    .infer_chromatography()
                    .map_err(MonitorError::from)
                    .and_then(|c| Ok((c, self.atlas_loader.load(c)?)));
                match loaded {
                    Ok((chromatography, atlas)) => {
                        info!("Loaded {} atlas with {} compounds", chromatography, atlas.len());
                        atlas
                    }
                    Err(e) => {
                        let reason = format!("No compound atlas for {}: {}", file.name(), e);
                        return self.abort(path, reason);
                    }
                }
            }
        };

        let batch = match self.source.convert(&path) {
            Ok(run) => {
                let batch = analyze_spectra(
                    &mut file,
                    run.spectra(),
                    &atlas,
                    &self.config.extraction,
                    &self.config.panels,
                );
                // Dropping the run discards the converted intermediate.
                drop(run);
                Some(batch)
            }
            Err(e) => {
                warn!("Conversion failed for {}: {}", file.name(), e);
                None
            }
        };
        self.atlas = Some(atlas);

        match batch {
            Some(batch) => {
                let store = self.store.as_mut().ok_or(MonitorError::StoreClosed)?;
                store.append(&batch)?;
                debug!(
                    "{}: {} peak rows, {} MS2 rows",
                    file.name(),
                    batch.peaks.len(),
                    batch.ms2_matches.len()
                );
                self.report.processed.push(path.clone());
            }
            None => self.report.failed.push(path.clone()),
        }

        self.finish_file(&path)?;
        Ok(MonitorState::ProcessingFile)
    }

    fn finish_file(&mut self, path: &Path) -> Result<(), MonitorError> {
        self.dataset.mark_analyzed(path)?;
        self.since_checkpoint += 1;
        self.log_progress();
        Ok(())
    }

    fn checkpoint_export(&mut self) -> Result<MonitorState, MonitorError> {
        info!("Exporting and continuing analysis...");
        let store = self.store.as_ref().ok_or(MonitorError::StoreClosed)?;
        let tables = store.read_all()?;
        let label = SnapshotLabel::Checkpoint(self.dataset.analyzed_count());
        let stats = self.exporter.export(label, &tables, &self.warnings)?;

        self.report.checkpoints.push(stats.directory);
        self.since_checkpoint = 0;
        Ok(MonitorState::CheckpointExport)
    }

    fn final_export(&mut self) -> Result<MonitorState, MonitorError> {
        info!("Exporting results...");
        let store = self.store.as_ref().ok_or(MonitorError::StoreClosed)?;
        let tables = store.read_all()?;
        let stats = self
            .exporter
            .export(SnapshotLabel::Full, &tables, &self.warnings)?;
        if let Some(store) = self.store.take() {
            store.teardown()?;
        }

        self.report.final_export = Some(stats.directory);
        Ok(MonitorState::FinalExport)
    }

    fn abort(&mut self, file: PathBuf, reason: String) -> Result<MonitorState, MonitorError> {
        error!("{}", reason);
        error!("Analysis interrupted, discarding unexported results");
        self.report.outcome = MonitorOutcome::Aborted { file, reason };
        if let Some(store) = self.store.take() {
            store.teardown()?;
        }
        Ok(MonitorState::Aborted)
    }

    fn log_progress(&self) {
        info!(
            "Progress: {}/{} files analyzed",
            self.dataset.analyzed_count(),
            self.target
        );
    }
}
