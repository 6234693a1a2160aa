//! End-to-end sessions of the acquisition monitor
//!
//! A fake spectral source stands in for the converter and a manual clock
//! replaces real sleeps, so each scenario runs in milliseconds.

use ms_sentry::atlas::CompoundAtlas;
use ms_sentry::monitor::{
    Clock, Collaborators, ManualClock, Monitor, MonitorConfig, MonitorOutcome, MonitorState,
};
use ms_sentry::spectra::{
    CollectionModeChecker, ConvertedRun, SourceError, SpectralSource, Spectrum,
};
use ms_sentry::store::{read_table, Ms2MatchRecord, PeakRecord, TicRecord};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::{tempdir, TempDir};

/// One MS1 scan at the phenylalanine standard's RT plus one MS2 scan of it
struct StandardsSource;

impl SpectralSource for StandardsSource {
    fn convert(&mut self, _raw: &Path) -> Result<ConvertedRun, SourceError> {
        Ok(ConvertedRun::new(vec![
            Spectrum {
                index: 0,
                ms_level: 1,
                retention_time: 8.95,
                mz: vec![176.1130, 218.1281],
                intensity: vec![2.0e6, 1.0e5],
                centroided: true,
                ..Default::default()
            },
            Spectrum {
                index: 1,
                ms_level: 1,
                retention_time: 9.05,
                mz: vec![174.0990, 176.1136],
                intensity: vec![3.0e6, 8.0e6],
                centroided: true,
                ..Default::default()
            },
            Spectrum {
                index: 2,
                ms_level: 2,
                retention_time: 9.06,
                precursor_mz: Some(176.1135),
                mz: vec![111.0808, 140.0793],
                intensity: vec![5.0e5, 2.0e5],
                centroided: true,
                ..Default::default()
            },
        ]))
    }
}

struct AlwaysCentroid;

impl CollectionModeChecker for AlwaysCentroid {
    fn is_centroided(&mut self, _raw: &Path, _sample_size: usize) -> Result<bool, SourceError> {
        Ok(true)
    }
}

/// Reports profile data for one named file
struct ProfileFile(String);

impl CollectionModeChecker for ProfileFile {
    fn is_centroided(&mut self, raw: &Path, _sample_size: usize) -> Result<bool, SourceError> {
        Ok(raw.file_name().and_then(|n| n.to_str()) != Some(self.0.as_str()))
    }
}

/// A manual clock whose every sleep coincides with another write to `file`
struct WritingClock {
    clock: ManualClock,
    file: PathBuf,
}

impl Clock for WritingClock {
    fn now(&self) -> SystemTime {
        self.clock.now()
    }

    fn sleep(&mut self, duration: Duration) {
        self.clock.sleep(duration);
        File::options()
            .write(true)
            .open(&self.file)
            .unwrap()
            .set_modified(self.clock.now())
            .unwrap();
    }
}

fn acquisition_name(polarity: &str, ms: &str, run: usize) -> String {
    format!(
        "20240312_JGI_MD_507130_BioSoil_QE139_20240312_C18_USDAY59554_{}_{}_0_QC_Post_Rg80to1200-CE102040-soil-S1_{}.raw",
        polarity, ms, run
    )
}

fn touch(dir: &Path, name: &str, modified: SystemTime) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    file.set_modified(modified).unwrap();
    path
}

struct Session {
    source: TempDir,
    store: TempDir,
    clock: ManualClock,
}

impl Session {
    fn new(clock: ManualClock) -> Self {
        Self {
            source: tempdir().unwrap(),
            store: tempdir().unwrap(),
            clock,
        }
    }

    fn config(&self) -> MonitorConfig {
        let mut config = MonitorConfig::new(self.source.path());
        config.store_root = self.store.path().to_path_buf();
        config
    }

    fn start(&self, config: MonitorConfig) -> Monitor {
        self.start_with(config, Box::new(AlwaysCentroid), Box::new(self.clock.clone()))
    }

    fn start_with(
        &self,
        config: MonitorConfig,
        checker: Box<dyn CollectionModeChecker>,
        clock: Box<dyn Clock>,
    ) -> Monitor {
        let collaborators = Collaborators::new(
            Box::new(StandardsSource),
            checker,
            Box::new(CompoundAtlas::builtin_internal_standards()),
        )
        .with_clock(clock);
        Monitor::new(config, collaborators).unwrap()
    }

    /// `count` aged files, oldest first
    fn aged_files(&self, count: usize) -> Vec<PathBuf> {
        let base = SystemTime::now() - Duration::from_secs(3600);
        (1..=count)
            .map(|run| {
                let modified = base + Duration::from_secs(run as u64);
                touch(self.source.path(), &acquisition_name("POS", "MS1", run), modified)
            })
            .collect()
    }

    fn snapshot(&self, label: &str) -> PathBuf {
        self.source.path().join(format!("qc_output_{}", label))
    }
}

#[test]
fn test_young_files_are_never_processed() {
    let session = Session::new(ManualClock::new(SystemTime::now()).frozen());
    let now = SystemTime::now();
    for run in 1..=3 {
        touch(session.source.path(), &acquisition_name("POS", "MS1", run), now);
    }

    let mut monitor = session.start(session.config());
    assert_eq!(monitor.target(), 3);

    for _ in 0..20 {
        let state = monitor.step().unwrap();
        assert!(matches!(
            state,
            MonitorState::AgeGating | MonitorState::WaitingForFiles
        ));
    }

    assert_eq!(monitor.dataset().analyzed_count(), 0);
    assert!(monitor.report().processed.is_empty());
    let tables = monitor.store().unwrap().read_all().unwrap();
    assert!(tables.is_empty());
    assert!(session.clock.sleep_count() >= 20);
}

#[test]
fn test_checkpoints_every_five_files() {
    let start = SystemTime::now();
    let session = Session::new(ManualClock::new(start + Duration::from_secs(3600)));
    for run in 1..=12 {
        let modified = start - Duration::from_secs(600 - run as u64);
        touch(session.source.path(), &acquisition_name("POS", "MS1", run), modified);
    }

    let mut config = session.config();
    config.export_interval = Some(5);
    config.target_files = Some(12);
    let mut monitor = session.start(config);
    let store_dir = monitor.store().unwrap().dir().to_path_buf();

    let mut transitions = Vec::new();
    while !monitor.state().is_terminal() {
        let state = monitor.step().unwrap();
        if state == MonitorState::CheckpointExport {
            transitions.push(monitor.dataset().analyzed_count());
            assert!(store_dir.is_dir());
            assert!(monitor.store().is_some());
        }
    }

    assert_eq!(transitions, vec![5, 10]);
    let report = monitor.report();
    assert_eq!(report.outcome, MonitorOutcome::Done);
    assert_eq!(
        report.checkpoints,
        vec![session.snapshot("5"), session.snapshot("10")]
    );
    assert_eq!(report.final_export, Some(session.snapshot("full")));
    assert!(!store_dir.exists());

    let checkpoint: Vec<PeakRecord> =
        read_table(&session.snapshot("5").join("ms1_data_sheet.csv")).unwrap();
    assert_eq!(checkpoint.len(), 5 * 4);
    let full: Vec<PeakRecord> =
        read_table(&session.snapshot("full").join("ms1_data_sheet.csv")).unwrap();
    assert_eq!(full.len(), 12 * 4);
    let runs: Vec<u32> = full.iter().step_by(4).map(|r| r.run_num).collect();
    assert_eq!(runs, (1..=12).collect::<Vec<u32>>());

    let tics: Vec<TicRecord> =
        read_table(&session.snapshot("full").join("ms1_tic_data_sheet.csv")).unwrap();
    assert_eq!(tics.len(), 12);
    assert!(!session.snapshot("full").join("ms2_data_sheet.csv").exists());
}

#[test]
fn test_age_gate_waits_then_processes() {
    let now = SystemTime::now();
    let session = Session::new(ManualClock::new(now));
    touch(session.source.path(), &acquisition_name("POS", "MS1", 1), now);

    let mut config = session.config();
    config.write_parquet = false;
    let min_age = config.min_file_age;
    let mut monitor = session.start(config);

    assert_eq!(monitor.step().unwrap(), MonitorState::AgeGating);
    assert!(session.clock.total_slept() >= min_age);
    assert_eq!(monitor.step().unwrap(), MonitorState::ProcessingFile);

    let report = monitor.run().unwrap();
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.outcome, MonitorOutcome::Done);
}

#[test]
fn test_waits_for_late_files() {
    let start = SystemTime::now() - Duration::from_secs(3600);
    let session = Session::new(ManualClock::new(SystemTime::now()));
    touch(session.source.path(), &acquisition_name("POS", "MS1", 1), start);

    let mut config = session.config();
    config.target_files = Some(2);
    let mut monitor = session.start(config);

    assert_eq!(monitor.step().unwrap(), MonitorState::ProcessingFile);
    assert_eq!(monitor.step().unwrap(), MonitorState::WaitingForFiles);
    assert_eq!(monitor.step().unwrap(), MonitorState::WaitingForFiles);

    touch(
        session.source.path(),
        &acquisition_name("POS", "MS1", 2),
        start + Duration::from_secs(60),
    );
    let report = monitor.run().unwrap();
    assert_eq!(report.processed.len(), 2);
    assert_eq!(monitor.dataset().analyzed_count(), 2);
}

#[test]
fn test_fps_ms2_file_matches_both_panels() {
    let session = Session::new(ManualClock::new(SystemTime::now()));
    touch(
        session.source.path(),
        &acquisition_name("FPS", "MS2", 3),
        SystemTime::now() - Duration::from_secs(3600),
    );

    let mut monitor = session.start(session.config());
    let report = monitor.run().unwrap();
    assert_eq!(report.outcome, MonitorOutcome::Done);

    let full = session.snapshot("full");
    let peaks: Vec<PeakRecord> = read_table(&full.join("ms1_data_sheet.csv")).unwrap();
    assert_eq!(peaks.len(), 8);

    let phe_pos = peaks
        .iter()
        .find(|r| r.compound_name == "13C,15N-Phenylalanine" && r.polarity.as_str() == "POS")
        .unwrap();
    assert_eq!(phe_pos.observed_intensity, 8.0e6);
    assert_eq!(phe_pos.retention_time, 9.05);

    let cytosine = peaks
        .iter()
        .find(|r| r.compound_name == "13C2,15N3-Cytosine")
        .unwrap();
    assert!(cytosine.observed_mz.is_nan());
    assert!(cytosine.ppm_error.is_nan());

    let ms2: Vec<Ms2MatchRecord> = read_table(&full.join("ms2_data_sheet.csv")).unwrap();
    assert_eq!(ms2.len(), 4 + 3);
    assert!(full.join("ms2_data_sheet.parquet").is_file());
    assert!(full.join("manifest.json").is_file());
}

#[test]
fn test_file_still_being_written_is_not_processed() {
    let now = SystemTime::now();
    let session = Session::new(ManualClock::new(now));
    let path = touch(session.source.path(), &acquisition_name("POS", "MS1", 1), now);

    let config = session.config();
    let min_age = config.min_file_age;
    let clock = WritingClock {
        clock: session.clock.clone(),
        file: path,
    };
    let mut monitor = session.start_with(config, Box::new(AlwaysCentroid), Box::new(clock));

    for _ in 0..5 {
        assert_eq!(monitor.step().unwrap(), MonitorState::AgeGating);
    }
    assert!(session.clock.total_slept() >= min_age * 5);
    assert_eq!(monitor.dataset().analyzed_count(), 0);
    assert!(monitor.report().processed.is_empty());
}

#[test]
fn test_checkpoint_on_the_final_file_is_written() {
    let session = Session::new(ManualClock::new(SystemTime::now()));
    session.aged_files(10);

    let mut config = session.config();
    config.export_interval = Some(5);
    config.target_files = Some(10);
    config.write_parquet = false;
    let mut monitor = session.start(config);

    let mut states = Vec::new();
    while !monitor.state().is_terminal() {
        states.push(monitor.step().unwrap());
    }

    let report = monitor.report();
    assert_eq!(report.outcome, MonitorOutcome::Done);
    assert_eq!(
        report.checkpoints,
        vec![session.snapshot("5"), session.snapshot("10")]
    );
    assert_eq!(report.final_export, Some(session.snapshot("full")));
    assert_eq!(
        &states[states.len() - 3..],
        &[
            MonitorState::CheckpointExport,
            MonitorState::FinalExport,
            MonitorState::Done
        ]
    );

    let last: Vec<PeakRecord> =
        read_table(&session.snapshot("10").join("ms1_data_sheet.csv")).unwrap();
    assert_eq!(last.len(), 10 * 4);
}

#[test]
fn test_abort_keeps_earlier_checkpoints() {
    let session = Session::new(ManualClock::new(SystemTime::now()));
    let files = session.aged_files(6);
    let profile_name = files[5].file_name().unwrap().to_string_lossy().into_owned();

    let mut config = session.config();
    config.export_interval = Some(5);
    let mut monitor = session.start_with(
        config,
        Box::new(ProfileFile(profile_name)),
        Box::new(session.clock.clone()),
    );
    let store_dir = monitor.store().unwrap().dir().to_path_buf();

    let report = monitor.run().unwrap();
    match &report.outcome {
        MonitorOutcome::Aborted { file, .. } => assert_eq!(file, &files[5]),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(report.checkpoints, vec![session.snapshot("5")]);
    assert!(report.final_export.is_none());

    let kept: Vec<PeakRecord> =
        read_table(&session.snapshot("5").join("ms1_data_sheet.csv")).unwrap();
    assert_eq!(kept.len(), 5 * 4);
    assert!(!session.snapshot("full").exists());
    assert!(!store_dir.exists());
}
