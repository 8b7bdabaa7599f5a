//! End-to-end tests for the walk → size → hash → group pipeline.

use dupwalk::analysis::Report;
use dupwalk::pipeline::{
    Pipeline, PipelineCallback, PipelineOptions, PipelineStatus, SessionPaths, Stage, TaskError,
};
use dupwalk::snapshot::TreeSnapshot;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    report: Option<Report>,
    errors: Vec<(Stage, String)>,
    hashes: Vec<String>,
    sizes: Vec<u64>,
    stop_after: Option<usize>,
    calls: usize,
}

impl Recorder {
    fn stopping_after(calls: usize) -> Self {
        Self {
            stop_after: Some(calls),
            ..Self::default()
        }
    }

    fn tick(&mut self) {
        self.calls += 1;
    }
}

impl PipelineCallback for Recorder {
    fn on_filewalk_progress(&mut self, _folders: usize, _files: usize) {
        self.tick();
    }

    fn on_filewalk_loading(&mut self, _path: &Path) {
        self.events.push("loading".into());
    }

    fn on_filewalk_saving(&mut self, _path: &Path) {
        self.events.push("saving".into());
    }

    fn on_filewalk_finished(&mut self, snapshot: &TreeSnapshot) {
        self.events.push(format!("walk {}", snapshot.len()));
    }

    fn on_filesize_progress(&mut self, _files: usize, _bytes: u64) {
        self.tick();
    }

    fn on_filesize_finished(&mut self, sizes: &[u64], total_bytes: u64) {
        self.sizes = sizes.to_vec();
        self.events.push(format!("sizes {total_bytes}"));
    }

    fn on_hashing_progress(&mut self, _files: usize, _bytes: u64) {
        self.tick();
    }

    fn on_hashing_finished(&mut self, hashes: &[String]) {
        self.hashes = hashes.to_vec();
        self.events.push(format!("hashes {}", hashes.len()));
    }

    fn on_analysis_finished(&mut self, report: Report) {
        self.events.push("report".into());
        self.report = Some(report);
    }

    fn on_task_error(&mut self, stage: Stage, error: &TaskError) {
        self.errors.push((stage, error.to_string()));
    }

    fn terminating(&self) -> bool {
        self.stop_after.is_some_and(|limit| self.calls >= limit)
    }
}

/// `data/x/{a,b,c}` and `data/y/{a,b,d}` where the `a` and `b` files match.
fn fixture() -> (TempDir, PathBuf, SessionPaths) {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    for sub in ["x", "y"] {
        fs::create_dir_all(data.join(sub)).unwrap();
        fs::write(data.join(sub).join("a"), b"alpha").unwrap();
        fs::write(data.join(sub).join("b"), b"bravo bravo").unwrap();
    }
    fs::write(data.join("x").join("c"), b"unique one").unwrap();
    fs::write(data.join("y").join("d"), b"unique two!").unwrap();

    let session = SessionPaths::new(dir.path().join("session"));
    session.ensure_dir().unwrap();
    (dir, data, session)
}

fn run(options: PipelineOptions, recorder: Recorder) -> (PipelineStatus, Recorder) {
    let mut pipeline = Pipeline::new(options, recorder);
    let status = pipeline.run();
    (status, pipeline.into_callback())
}

#[test]
fn test_full_run_reports_shared_directories() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session.clone()).with_roots(vec![data.clone()]);

    let (status, recorder) = run(options, Recorder::default());

    assert_eq!(status, PipelineStatus::Finished);
    assert!(recorder.errors.is_empty());
    assert_eq!(
        recorder.events,
        vec!["saving", "walk 6", "sizes 53", "hashes 6", "report"]
    );

    let report = recorder.report.unwrap();
    assert_eq!(report.len(), 1);
    let item = &report.items()[0];
    assert_eq!(item.dirs(), [data.join("x"), data.join("y")]);
    assert_eq!(item.rows().len(), 2);
    assert_eq!(report.duplicated_bytes(), 5 + 11);

    assert!(session.walk_file().exists());
    assert_eq!(
        fs::read_to_string(session.size_file()).unwrap().lines().count(),
        6
    );
    assert_eq!(
        fs::read_to_string(session.hash_file()).unwrap().lines().count(),
        6
    );
}

#[test]
fn test_rerun_loads_walk_and_skips_work() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session.clone()).with_roots(vec![data]);
    let (_, first) = run(options, Recorder::default());

    // no roots needed once the walk log exists
    let (status, second) = run(PipelineOptions::new(session.clone()), Recorder::default());

    assert_eq!(status, PipelineStatus::Finished);
    assert_eq!(second.events[0], "loading");
    assert_eq!(second.hashes, first.hashes);
    assert_eq!(second.sizes, first.sizes);
    assert_eq!(second.report, first.report);
    assert_eq!(
        fs::read_to_string(session.hash_file()).unwrap().lines().count(),
        6
    );
}

#[test]
fn test_cancelled_run_resumes() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session.clone()).with_roots(vec![data]);

    // three walk steps (data, x, y), the size resume step, then six sizes and
    // the hash resume step; stop two files into hashing
    let (status, cancelled) = run(options.clone(), Recorder::stopping_after(13));
    assert_eq!(status, PipelineStatus::Cancelled);
    assert!(cancelled.report.is_none());
    assert!(!cancelled.events.iter().any(|e| e.starts_with("hashes")));
    let logged = fs::read_to_string(session.hash_file()).unwrap();
    assert_eq!(logged.lines().count(), 2);

    let (status, resumed) = run(options, Recorder::default());
    assert_eq!(status, PipelineStatus::Finished);
    assert_eq!(resumed.hashes.len(), 6);
    assert!(resumed.report.is_some());
    assert_eq!(
        fs::read_to_string(session.hash_file()).unwrap().lines().count(),
        6
    );
}

#[test]
fn test_cancel_during_walk_writes_no_walk_log() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session.clone()).with_roots(vec![data]);

    let (status, recorder) = run(options, Recorder::stopping_after(1));

    assert_eq!(status, PipelineStatus::Cancelled);
    assert!(recorder.events.is_empty());
    assert!(!session.walk_file().exists());
}

#[test]
fn test_leftover_partial_walk_log_is_ignored() {
    let (_dir, data, session) = fixture();
    let partial = session.dir().join("file_walk.txt.tmp");
    fs::write(&partial, format!("{}\na\n", data.join("x").display())).unwrap();
    let options = PipelineOptions::new(session.clone()).with_roots(vec![data]);

    let (status, recorder) = run(options, Recorder::default());

    assert_eq!(status, PipelineStatus::Finished);
    assert_eq!(recorder.events[0], "saving");
    assert_eq!(recorder.events[1], "walk 6");
    assert!(session.walk_file().exists());
    assert!(!partial.exists());
}

#[cfg(unix)]
#[test]
fn test_special_files_do_not_block_hashing() {
    let (_dir, data, session) = fixture();
    let status = std::process::Command::new("mkfifo")
        .arg(data.join("x").join("pipe"))
        .status()
        .unwrap();
    assert!(status.success());
    let options = PipelineOptions::new(session).with_roots(vec![data]);

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let (status, recorder) = run(options, Recorder::default());
        tx.send((status, recorder.hashes.len())).unwrap();
    });

    let (status, hashed) = rx
        .recv_timeout(std::time::Duration::from_secs(10))
        .expect("pipeline blocked on a FIFO");
    assert_eq!(status, PipelineStatus::Finished);
    assert_eq!(hashed, 6);
}

#[test]
fn test_missing_roots_is_a_walk_error() {
    let (_dir, _data, session) = fixture();
    let (status, recorder) = run(PipelineOptions::new(session), Recorder::default());

    assert_eq!(status, PipelineStatus::Failed);
    assert_eq!(recorder.errors.len(), 1);
    assert_eq!(recorder.errors[0].0, Stage::Walk);
}

#[test]
fn test_changed_file_fails_resume_with_integrity_error() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session.clone()).with_roots(vec![data.clone()]);
    run(options.clone(), Recorder::default());

    // the last sized file (y/d) is inside the verified window
    fs::write(data.join("y").join("d"), b"grown since the last run").unwrap();
    let (status, recorder) = run(options, Recorder::default());

    assert_eq!(status, PipelineStatus::Failed);
    assert_eq!(recorder.errors[0].0, Stage::Size);
    assert!(recorder.errors[0].1.contains("stale"));
    assert!(recorder.report.is_none());
}

#[test]
fn test_ignored_directory_drops_groups() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session)
        .with_roots(vec![data.clone()])
        .with_ignored(vec![data.join("y")]);

    let (status, recorder) = run(options, Recorder::default());

    assert_eq!(status, PipelineStatus::Finished);
    assert!(recorder.report.unwrap().is_empty());
}

#[test]
fn test_step_after_finish_is_idempotent() {
    let (_dir, data, session) = fixture();
    let options = PipelineOptions::new(session).with_roots(vec![data]);
    let mut pipeline = Pipeline::new(options, Recorder::default());

    assert_eq!(pipeline.run(), PipelineStatus::Finished);
    assert_eq!(pipeline.step(), PipelineStatus::Finished);
    assert_eq!(pipeline.snapshot().len(), 6);
}
