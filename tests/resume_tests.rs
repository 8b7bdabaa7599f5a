//! Checkpoint resume behaviour of the size and hash stages on real trees.

use dupwalk::snapshot::TreeSnapshot;
use dupwalk::stage::{
    HashMetric, Hasher, ResumableStage, SizeMetric, StageError, StageStep,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn tree(files: &[(&str, &[u8])]) -> (TempDir, TreeSnapshot) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let snapshot = TreeSnapshot::from_walk(&[&root]).unwrap();
    (dir, snapshot)
}

fn drain<M: dupwalk::stage::FileMetric>(
    stage: &mut ResumableStage<M>,
    snapshot: &TreeSnapshot,
) -> Result<usize, StageError> {
    let mut processed = 0;
    loop {
        match stage.step(snapshot)? {
            StageStep::Progress { .. } => processed += 1,
            StageStep::Resumed { .. } => {}
            StageStep::Finished => return Ok(processed),
        }
    }
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

const FILES: &[(&str, &[u8])] = &[
    ("one", b"1"),
    ("two", b"22"),
    ("sub/three", b"333"),
    ("sub/four", b"4444"),
    ("sub/deeper/five", b"55555"),
    ("sub/deeper/six", b"666666"),
];

#[test]
fn test_resume_processes_exactly_the_remaining_files() {
    let (dir, snapshot) = tree(FILES);
    let log = dir.path().join("sizes.txt");
    let full: Vec<u64> = snapshot
        .iter()
        .map(|p| fs::metadata(p).unwrap().len())
        .collect();

    let prefix: String = full[..4].iter().map(|s| format!("{s}\n")).collect();
    fs::write(&log, prefix).unwrap();

    let mut stage = ResumableStage::new(SizeMetric, &log);
    assert_eq!(drain(&mut stage, &snapshot).unwrap(), 2);
    assert_eq!(stage.results(), full.as_slice());
    assert_eq!(line_count(&log), 6);
}

#[test]
fn test_unterminated_last_record_gets_a_line_break() {
    let (dir, snapshot) = tree(FILES);
    let log = dir.path().join("sizes.txt");
    let sizes: Vec<u64> = snapshot
        .iter()
        .map(|p| fs::metadata(p).unwrap().len())
        .collect();
    fs::write(&log, format!("{}\n{}", sizes[0], sizes[1])).unwrap();

    let mut stage = ResumableStage::new(SizeMetric, &log);
    drain(&mut stage, &snapshot).unwrap();

    let expected: String = sizes.iter().map(|s| format!("{s}\n")).collect();
    assert_eq!(fs::read_to_string(&log).unwrap(), expected);
}

#[test]
fn test_hash_resume_counts_bytes_already_hashed() {
    let (dir, snapshot) = tree(FILES);
    let sizes: Vec<u64> = snapshot
        .iter()
        .map(|p| fs::metadata(p).unwrap().len())
        .collect();
    let hashes: Vec<String> = snapshot
        .iter()
        .map(|p| blake3::hash(&fs::read(p).unwrap()).to_hex().to_string())
        .collect();
    let log = dir.path().join("hashes.txt");
    fs::write(&log, format!("{}\n{}\n", hashes[0], hashes[1])).unwrap();

    let metric = HashMetric::new(Hasher::new(), sizes.clone());
    let mut stage = ResumableStage::new(metric, &log);
    assert_eq!(
        stage.step(&snapshot).unwrap(),
        StageStep::Resumed {
            file_count: 2,
            byte_count: sizes[0] + sizes[1],
        }
    );
    drain(&mut stage, &snapshot).unwrap();
    assert_eq!(stage.results(), hashes.as_slice());
    assert_eq!(stage.byte_count(), sizes.iter().sum::<u64>());
}

#[test]
fn test_mutation_inside_window_is_an_integrity_error() {
    let (dir, snapshot) = tree(FILES);
    let log = dir.path().join("hashes.txt");
    let sizes: Vec<u64> = snapshot
        .iter()
        .map(|p| fs::metadata(p).unwrap().len())
        .collect();

    let metric = HashMetric::new(Hasher::new(), sizes.clone());
    let mut stage = ResumableStage::new(metric, &log);
    for _ in 0..6 {
        stage.step(&snapshot).unwrap();
    }
    drop(stage);
    assert_eq!(line_count(&log), 5);

    // records 2 to 4 form the window; record 3 changes content but not size
    let victim = snapshot.get(3).unwrap();
    let len = fs::metadata(&victim).unwrap().len() as usize;
    fs::write(&victim, vec![b'z'; len]).unwrap();

    let metric = HashMetric::new(Hasher::new(), sizes);
    let mut stage = ResumableStage::new(metric, &log);
    match stage.step(&snapshot) {
        Err(StageError::Integrity { index, file, .. }) => {
            assert_eq!(index, 3);
            assert_eq!(file, victim);
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
    assert_eq!(line_count(&log), 5);
}

#[test]
fn test_mutation_before_window_goes_unnoticed() {
    let (dir, snapshot) = tree(FILES);
    let log = dir.path().join("sizes.txt");
    let mut stage = ResumableStage::new(SizeMetric, &log);
    drain(&mut stage, &snapshot).unwrap();

    fs::write(snapshot.get(0).unwrap(), b"much longer now").unwrap();

    let mut stage = ResumableStage::new(SizeMetric, &log);
    assert_eq!(drain(&mut stage, &snapshot).unwrap(), 0);
    assert_eq!(stage.results()[0], 1);
}
