use super::*;
use crate::filename::GrammarValidator;
use proptest::prelude::*;
use std::fs::File;
use tempfile::tempdir;

fn touch(dir: &Path, name: &str, modified: SystemTime) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    file.set_modified(modified).unwrap();
    path
}

fn acquisition(chromatography: &str, run: u32) -> String {
    format!(
        "20240101_JGI_MD_123456_Proj_MX_20240101_{}_USDAY1_POS_MS1_0_S1_Rep1_Opt_{}.raw",
        chromatography, run
    )
}

fn at(seconds: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + seconds)
}

#[test]
fn test_missing_directory() {
    let dir = tempdir().unwrap();
    let result = Dataset::new(dir.path().join("nope"), DEFAULT_EXTENSION);
    assert!(matches!(result, Err(DatasetError::NotADirectory(_))));
}

#[test]
fn test_refresh_sorts_by_mtime_and_filters_extension() {
    let dir = tempdir().unwrap();
    let late = touch(dir.path(), "b.raw", at(300));
    let early = touch(dir.path(), "a.RAW", at(100));
    touch(dir.path(), "notes.txt", at(50));
    touch(dir.path(), "c.mzML", at(10));

    let dataset = Dataset::new(dir.path(), ".raw").unwrap();
    let pending: Vec<_> = dataset.pending().iter().map(|f| f.path.clone()).collect();
    assert_eq!(pending, vec![early.clone(), late.clone()]);
    assert_eq!(dataset.oldest_pending().unwrap().path, early);
    assert_eq!(dataset.youngest_pending().unwrap().path, late);
}

#[test]
fn test_mark_analyzed_once() {
    let dir = tempdir().unwrap();
    let a = touch(dir.path(), "a.raw", at(1));
    let b = touch(dir.path(), "b.raw", at(2));

    let mut dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    dataset.mark_analyzed(&a).unwrap();
    assert_eq!(dataset.analyzed(), &[a.clone()]);
    assert_eq!(dataset.pending().len(), 1);

    assert!(matches!(
        dataset.mark_analyzed(&a),
        Err(DatasetError::NotPending(_))
    ));
    assert!(matches!(
        dataset.mark_analyzed(&dir.path().join("ghost.raw")),
        Err(DatasetError::NotPending(_))
    ));

    dataset.mark_analyzed(&b).unwrap();
    assert_eq!(dataset.analyzed_count(), 2);
}

#[test]
fn test_refresh_never_resurrects_analyzed() {
    let dir = tempdir().unwrap();
    let a = touch(dir.path(), "a.raw", at(1));

    let mut dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    dataset.mark_analyzed(&a).unwrap();

    let c = touch(dir.path(), "c.raw", at(5));
    dataset.refresh().unwrap();
    dataset.refresh().unwrap();

    assert!(dataset.is_analyzed(&a));
    let pending: Vec<_> = dataset.pending().iter().map(|f| f.path.clone()).collect();
    assert_eq!(pending, vec![c]);
}

#[test]
fn test_infer_chromatography() {
    let dir = tempdir().unwrap();
    touch(dir.path(), &acquisition("HILICZ", 2), at(20));
    touch(dir.path(), &acquisition("C18", 1), at(10));
    let dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    assert_eq!(dataset.infer_chromatography().unwrap(), Chromatography::C18);

    let dir = tempdir().unwrap();
    touch(dir.path(), &acquisition("HILICZ", 1), at(10));
    let dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    assert_eq!(dataset.infer_chromatography().unwrap(), Chromatography::Hilic);
}

#[test]
fn test_infer_chromatography_errors() {
    let dir = tempdir().unwrap();
    let dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    assert!(matches!(
        dataset.infer_chromatography(),
        Err(DatasetError::NoPendingFiles(_))
    ));

    touch(dir.path(), &acquisition("RP", 1), at(10));
    let dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    match dataset.infer_chromatography() {
        Err(DatasetError::UnknownChromatography { tag, .. }) => assert_eq!(tag, "RP"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_validate_covers_pending_and_analyzed() {
    let dir = tempdir().unwrap();
    let good = touch(dir.path(), &acquisition("C18", 1), at(1));
    touch(dir.path(), "bad_name.raw", at(2));

    let mut dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    dataset.mark_analyzed(&good).unwrap();

    let messages = dataset.validate_filenames(&GrammarValidator);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages.iter().filter(|m| m.has_errors()).count(), 1);
}

#[test]
fn test_pending_age() {
    let file = PendingFile {
        path: PathBuf::from("a.raw"),
        modified: at(100),
    };
    assert_eq!(file.age(at(160)), Duration::from_secs(60));
    assert_eq!(file.age(at(50)), Duration::ZERO);
}

#[test]
fn test_youngest_pending_age_rereads_mtime() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.raw", at(100));
    let b = touch(dir.path(), "b.raw", at(200));

    let dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    assert_eq!(
        dataset.youngest_pending_age(at(260)).unwrap(),
        Some(Duration::from_secs(60))
    );

    // Still being written after discovery.
    File::options()
        .write(true)
        .open(&b)
        .unwrap()
        .set_modified(at(250))
        .unwrap();
    assert_eq!(
        dataset.youngest_pending_age(at(260)).unwrap(),
        Some(Duration::from_secs(10))
    );
    assert_eq!(dataset.youngest_pending().unwrap().modified, at(200));

    fs::remove_file(&b).unwrap();
    assert!(matches!(
        dataset.youngest_pending_age(at(260)),
        Err(DatasetError::IoError(_))
    ));
}

#[test]
fn test_youngest_pending_age_empty() {
    let dir = tempdir().unwrap();
    let dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();
    assert_eq!(dataset.youngest_pending_age(at(0)).unwrap(), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_pending_and_analyzed_stay_disjoint(
        ops in prop::collection::vec((0usize..6, any::<bool>()), 1..24),
    ) {
        let dir = tempdir().unwrap();
        let mut created = 0;
        let mut dataset = Dataset::new(dir.path(), DEFAULT_EXTENSION).unwrap();

        for (pick, add_file) in ops {
            if add_file && created < 6 {
                touch(dir.path(), &format!("f{}.raw", created), at(created as u64));
                created += 1;
                dataset.refresh().unwrap();
            } else if let Some(file) = dataset.pending().get(pick).cloned() {
                dataset.mark_analyzed(&file.path).unwrap();
                prop_assert!(dataset.mark_analyzed(&file.path).is_err());
            }

            for file in dataset.pending() {
                prop_assert!(!dataset.is_analyzed(&file.path));
            }
            prop_assert_eq!(dataset.pending().len() + dataset.analyzed_count(), created);
        }
    }
}
