//! Resumable walk → size → hash → group pipeline.
//!
//! # Overview
//!
//! [`Pipeline`] runs the four stages strictly in order on the caller's thread.
//! Every call to [`Pipeline::step`] performs one small unit of work and
//! returns, so a host with its own event loop can interleave input handling
//! and redraws between steps. All results and failures are reported through a
//! [`PipelineCallback`]; `step` itself never returns an error.
//!
//! # Persisted state
//!
//! Three plain-text logs live in the temp-data directory (see
//! [`SessionPaths`]): `file_walk.txt`, `sizes.txt` and `hashes.txt`. A rerun
//! with the same directory loads the walk, resumes the size and hash logs
//! after their last verified record and repeats only the grouping.
//!
//! # Cancellation
//!
//! After every step the pipeline polls [`PipelineCallback::terminating`]. When
//! it returns `true` the pipeline stops with [`PipelineStatus::Cancelled`]
//! without calling the current stage's finished callback. Work that was
//! already logged stays logged.
//!
//! # Example
//!
//! ```no_run
//! use dupwalk::analysis::Report;
//! use dupwalk::pipeline::{Pipeline, PipelineCallback, PipelineOptions, SessionPaths};
//! use std::path::PathBuf;
//!
//! #[derive(Default)]
//! struct Host {
//!     report: Option<Report>,
//! }
//!
//! impl PipelineCallback for Host {
//!     fn on_analysis_finished(&mut self, report: Report) {
//!         self.report = Some(report);
//!     }
//! }
//!
//! let options = PipelineOptions::new(SessionPaths::new("session"))
//!     .with_roots(vec![PathBuf::from("/data")]);
//! let mut pipeline = Pipeline::new(options, Host::default());
//! pipeline.run();
//! let report = pipeline.into_callback().report;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisError, GroupingStep, GroupingTask, Report, DEFAULT_YIELD_INTERVAL};
use crate::snapshot::{SnapshotError, TreeSnapshot, WalkStep, WalkTask};
use crate::stage::{
    HashMetric, Hasher, ResumableStage, SizeMetric, StageError, StageStep, DEFAULT_BLOCK_SIZE,
    DEFAULT_VERIFY_TAIL,
};

/// File name of the walk log.
pub const WALK_FILE: &str = "file_walk.txt";
/// File name of the size log.
pub const SIZE_FILE: &str = "sizes.txt";
/// File name of the hash log.
pub const HASH_FILE: &str = "hashes.txt";

/// Locations of the three checkpoint logs inside a temp-data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    dir: PathBuf,
}

impl SessionPaths {
    /// Use `dir` as the temp-data directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The temp-data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `file_walk.txt`.
    #[must_use]
    pub fn walk_file(&self) -> PathBuf {
        self.dir.join(WALK_FILE)
    }

    /// Path of `sizes.txt`.
    #[must_use]
    pub fn size_file(&self) -> PathBuf {
        self.dir.join(SIZE_FILE)
    }

    /// Path of `hashes.txt`.
    #[must_use]
    pub fn hash_file(&self) -> PathBuf {
        self.dir.join(HASH_FILE)
    }

    /// Create the temp-data directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be created.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}

/// Pipeline stage, as named in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Enumerating files (or loading the walk log)
    Walk,
    /// Computing file sizes
    Size,
    /// Hashing file contents
    Hash,
    /// Grouping duplicates
    Analysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Walk => write!(f, "file walk"),
            Stage::Size => write!(f, "size computation"),
            Stage::Hash => write!(f, "hashing"),
            Stage::Analysis => write!(f, "analysis"),
        }
    }
}

/// Error reported through [`PipelineCallback::on_task_error`].
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    /// No walk log exists and no root folder was given.
    #[error("At least one root folder must be given if walk file {0} is not present")]
    MissingRoots(PathBuf),

    /// Building, loading or saving the snapshot failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// A checkpointed stage failed.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Duplicate grouping failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// One-way notifications from the pipeline to its host.
///
/// Every method has a no-op default, so a host only implements what it
/// displays.
pub trait PipelineCallback {
    /// Another directory was walked.
    fn on_filewalk_progress(&mut self, _folder_count: usize, _file_count: usize) {}

    /// An existing walk log is being loaded instead of walking.
    fn on_filewalk_loading(&mut self, _path: &Path) {}

    /// The finished walk is being written to its log.
    fn on_filewalk_saving(&mut self, _path: &Path) {}

    /// The snapshot is complete.
    fn on_filewalk_finished(&mut self, _snapshot: &TreeSnapshot) {}

    /// Another file size was computed (or a log was resumed).
    fn on_filesize_progress(&mut self, _file_count: usize, _byte_count: u64) {}

    /// Every file has a size.
    fn on_filesize_finished(&mut self, _sizes: &[u64], _total_bytes: u64) {}

    /// Another file was hashed (or a log was resumed).
    fn on_hashing_progress(&mut self, _file_count: usize, _byte_count: u64) {}

    /// Every file has a hash.
    fn on_hashing_finished(&mut self, _hashes: &[String]) {}

    /// Part of the grouping index pass is done.
    fn on_analysis_progress(&mut self, _file_count: usize) {}

    /// The report is ready; ownership passes to the host.
    fn on_analysis_finished(&mut self, _report: Report) {}

    /// A stage failed; the pipeline has stopped.
    fn on_task_error(&mut self, _stage: Stage, _error: &TaskError) {}

    /// Polled after every step; `true` stops the pipeline.
    fn terminating(&self) -> bool {
        false
    }
}

/// Callback that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

impl PipelineCallback for NoopCallback {}

/// Where the pipeline stands after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// More work remains.
    Running,
    /// The report was delivered.
    Finished,
    /// Stopped because the host asked to terminate.
    Cancelled,
    /// Stopped after reporting a task error.
    Failed,
}

/// Inputs and tuning for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Checkpoint log locations
    pub paths: SessionPaths,
    /// Root folders to walk when no walk log exists
    pub roots: Vec<PathBuf>,
    /// Directories whose files never appear in the report
    pub ignored: Vec<PathBuf>,
    /// Read block size for hashing
    pub hash_block_size: usize,
    /// Trailing records recomputed when resuming a log
    pub verify_tail: usize,
    /// Files indexed per grouping step
    pub analysis_yield_interval: usize,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
}

impl PipelineOptions {
    /// Default options for the given temp-data directory.
    #[must_use]
    pub fn new(paths: SessionPaths) -> Self {
        Self {
            paths,
            roots: Vec::new(),
            ignored: Vec::new(),
            hash_block_size: DEFAULT_BLOCK_SIZE,
            verify_tail: DEFAULT_VERIFY_TAIL,
            analysis_yield_interval: DEFAULT_YIELD_INTERVAL,
            follow_symlinks: false,
        }
    }

    /// Set the root folders.
    #[must_use]
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    /// Set the ignored directories.
    #[must_use]
    pub fn with_ignored(mut self, ignored: Vec<PathBuf>) -> Self {
        self.ignored = ignored;
        self
    }

    /// Set the number of trailing records recomputed on resume.
    #[must_use]
    pub fn with_verify_tail(mut self, count: usize) -> Self {
        self.verify_tail = count;
        self
    }

    /// Set the number of files indexed per grouping step.
    #[must_use]
    pub fn with_analysis_yield_interval(mut self, interval: usize) -> Self {
        self.analysis_yield_interval = interval;
        self
    }
}

enum Phase {
    Start,
    Walk(WalkTask),
    Size(ResumableStage<SizeMetric>),
    Hash(ResumableStage<HashMetric>),
    Analysis(GroupingTask),
    Done(PipelineStatus),
}

impl Phase {
    fn stage(&self) -> Stage {
        match self {
            Phase::Start | Phase::Walk(_) | Phase::Done(_) => Stage::Walk,
            Phase::Size(_) => Stage::Size,
            Phase::Hash(_) => Stage::Hash,
            Phase::Analysis(_) => Stage::Analysis,
        }
    }
}

/// Step-driven pipeline owning its snapshot and its host callback.
pub struct Pipeline<C: PipelineCallback> {
    options: PipelineOptions,
    callback: C,
    phase: Phase,
    snapshot: TreeSnapshot,
}

impl<C: PipelineCallback> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("stage", &self.phase.stage())
            .field("files", &self.snapshot.len())
            .finish()
    }
}

impl<C: PipelineCallback> Pipeline<C> {
    /// Create a pipeline; no work happens until the first [`Pipeline::step`].
    #[must_use]
    pub fn new(options: PipelineOptions, callback: C) -> Self {
        Self {
            options,
            callback,
            phase: Phase::Start,
            snapshot: TreeSnapshot::new(),
        }
    }

    /// The host callback.
    #[must_use]
    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Consume the pipeline and return the host callback.
    #[must_use]
    pub fn into_callback(self) -> C {
        self.callback
    }

    /// The snapshot built or loaded so far.
    #[must_use]
    pub fn snapshot(&self) -> &TreeSnapshot {
        &self.snapshot
    }

    /// Stage currently running (or the last one run).
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.phase.stage()
    }

    /// Perform one unit of work and report where the pipeline stands.
    pub fn step(&mut self) -> PipelineStatus {
        if let Phase::Done(status) = self.phase {
            return status;
        }

        let stage = self.phase.stage();
        if let Err(err) = self.advance() {
            log::error!("Error while executing task {stage}: {err}");
            self.callback.on_task_error(stage, &err);
            self.phase = Phase::Done(PipelineStatus::Failed);
            return PipelineStatus::Failed;
        }

        if let Phase::Done(status) = self.phase {
            return status;
        }
        if self.callback.terminating() {
            log::debug!("Terminating {stage} due to application termination");
            self.phase = Phase::Done(PipelineStatus::Cancelled);
            return PipelineStatus::Cancelled;
        }
        PipelineStatus::Running
    }

    /// Step until the pipeline finishes, fails or is cancelled.
    pub fn run(&mut self) -> PipelineStatus {
        loop {
            match self.step() {
                PipelineStatus::Running => continue,
                status => return status,
            }
        }
    }

    fn advance(&mut self) -> Result<(), TaskError> {
        let next = match &mut self.phase {
            Phase::Start => Some(self.start()?),
            Phase::Walk(task) => match task.step()? {
                WalkStep::Listing {
                    folder_count,
                    file_count,
                } => {
                    self.callback.on_filewalk_progress(folder_count, file_count);
                    None
                }
                WalkStep::Finished => {
                    self.snapshot = task.take_snapshot();
                    let walk_file = self.options.paths.walk_file();
                    self.callback.on_filewalk_saving(&walk_file);
                    self.snapshot.save_to(&walk_file)?;
                    Some(self.walk_finished())
                }
            },
            Phase::Size(stage) => match stage.step(&self.snapshot)? {
                StageStep::Resumed {
                    file_count,
                    byte_count,
                }
                | StageStep::Progress {
                    file_count,
                    byte_count,
                } => {
                    self.callback.on_filesize_progress(file_count, byte_count);
                    None
                }
                StageStep::Finished => {
                    let sizes = stage.take_results();
                    let total_bytes = stage.byte_count();
                    log::debug!("Size computation finished: {total_bytes} bytes");
                    self.callback.on_filesize_finished(&sizes, total_bytes);
                    let hasher = Hasher::new().with_block_size(self.options.hash_block_size);
                    Some(Phase::Hash(
                        ResumableStage::new(
                            HashMetric::new(hasher, sizes),
                            &self.options.paths.hash_file(),
                        )
                        .with_verify_tail(self.options.verify_tail),
                    ))
                }
            },
            Phase::Hash(stage) => match stage.step(&self.snapshot)? {
                StageStep::Resumed {
                    file_count,
                    byte_count,
                }
                | StageStep::Progress {
                    file_count,
                    byte_count,
                } => {
                    self.callback.on_hashing_progress(file_count, byte_count);
                    None
                }
                StageStep::Finished => {
                    let hashes = stage.take_results();
                    log::debug!("Hashing finished: {} files", hashes.len());
                    self.callback.on_hashing_finished(&hashes);
                    let sizes = stage.metric_mut().take_sizes();
                    let paths: Vec<PathBuf> = self.snapshot.iter().collect();
                    let task =
                        GroupingTask::new(hashes, paths, sizes, self.options.ignored.clone())?
                            .with_yield_interval(self.options.analysis_yield_interval);
                    Some(Phase::Analysis(task))
                }
            },
            Phase::Analysis(task) => match task.step()? {
                GroupingStep::Progress { file_count } => {
                    self.callback.on_analysis_progress(file_count);
                    None
                }
                GroupingStep::Boundary => None,
                GroupingStep::Finished(report) => {
                    log::debug!(
                        "Analysis finished: {} items, {} duplicated bytes",
                        report.len(),
                        report.duplicated_bytes()
                    );
                    self.callback.on_analysis_finished(report);
                    Some(Phase::Done(PipelineStatus::Finished))
                }
            },
            Phase::Done(_) => None,
        };

        if let Some(phase) = next {
            self.phase = phase;
        }
        Ok(())
    }

    fn start(&mut self) -> Result<Phase, TaskError> {
        let walk_file = self.options.paths.walk_file();
        if walk_file.exists() {
            log::info!("Loading file walk from {}", walk_file.display());
            self.callback.on_filewalk_loading(&walk_file);
            self.snapshot = TreeSnapshot::load_from(&walk_file)?;
            return Ok(self.walk_finished());
        }

        if self.options.roots.is_empty() {
            return Err(TaskError::MissingRoots(walk_file));
        }
        log::debug!("File scanning started");
        Ok(Phase::Walk(
            WalkTask::new(self.options.roots.clone())
                .with_follow_symlinks(self.options.follow_symlinks),
        ))
    }

    fn walk_finished(&mut self) -> Phase {
        log::debug!(
            "File scanning finished: {} files in {} folders",
            self.snapshot.len(),
            self.snapshot.folder_count()
        );
        self.callback.on_filewalk_finished(&self.snapshot);
        Phase::Size(
            ResumableStage::new(SizeMetric, &self.options.paths.size_file())
                .with_verify_tail(self.options.verify_tail),
        )
    }
}
