//! Checkpointed per-file stages (file size, content hash).
//!
//! # Overview
//!
//! A [`ResumableStage`] computes one value per snapshot file and appends each
//! value to a checkpoint log the moment it is known. When a log already
//! exists, the stage reads it back, recomputes the last few logged values and
//! compares them before continuing after the last record. A mismatch means the
//! tree changed since the log was written and the stage stops with
//! [`StageError::Integrity`] instead of mixing stale and fresh results.
//!
//! What is computed is decided by a [`FileMetric`]:
//! - [`SizeMetric`]: file size in bytes (`sizes.txt`)
//! - [`HashMetric`]: BLAKE3 content digest (`hashes.txt`)
//!
//! # Scheduling
//!
//! [`ResumableStage::step`] performs exactly one unit of work (the resume
//! check, or one file) and returns. The caller decides when to call it again,
//! which is where an interactive host gets its chance to redraw and to
//! observe a termination request. A file in progress is always finished and
//! logged before `step` returns.
//!
//! # Example
//!
//! ```no_run
//! use dupwalk::snapshot::TreeSnapshot;
//! use dupwalk::stage::{ResumableStage, SizeMetric, StageStep};
//! use std::path::Path;
//!
//! let snapshot = TreeSnapshot::from_walk(&["/data"]).unwrap();
//! let mut stage = ResumableStage::new(SizeMetric, Path::new("session/sizes.txt"));
//! while let StageStep::Progress { file_count, byte_count } | StageStep::Resumed { file_count, byte_count } =
//!     stage.step(&snapshot).unwrap()
//! {
//!     println!("{file_count} files, {byte_count} bytes");
//! }
//! let sizes = stage.take_results();
//! ```

pub mod checkpoint;
pub mod hasher;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::snapshot::{Cursor, SnapshotError, TreeSnapshot};
use checkpoint::{read_log, CheckpointWriter};
pub use hasher::{is_hex_digest, Hasher, DEFAULT_BLOCK_SIZE};

/// Number of trailing records recomputed when resuming from a log.
pub const DEFAULT_VERIFY_TAIL: usize = 3;

/// A per-file value that a [`ResumableStage`] computes and logs.
pub trait FileMetric {
    /// Value stored per file; its `Display` form is the log line.
    type Value: Clone + PartialEq + fmt::Display + fmt::Debug;

    /// Compute the value for one file.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the stage.
    fn compute(&self, path: &Path) -> Result<Self::Value, StageError>;

    /// Parse one log line back into a value.
    fn parse(&self, line: &str) -> Option<Self::Value>;

    /// Bytes to add to the progress byte count for the file at `index`.
    fn bytes(&self, index: usize, value: &Self::Value) -> u64;

    /// Check preconditions against the snapshot before any work is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot run on this snapshot.
    fn check(&self, _snapshot: &TreeSnapshot) -> Result<(), StageError> {
        Ok(())
    }
}

/// File size in bytes, following symlinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeMetric;

impl FileMetric for SizeMetric {
    type Value = u64;

    fn compute(&self, path: &Path) -> Result<u64, StageError> {
        std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|source| StageError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    fn parse(&self, line: &str) -> Option<u64> {
        line.trim().parse().ok()
    }

    fn bytes(&self, _index: usize, value: &u64) -> u64 {
        *value
    }
}

/// BLAKE3 digest of the whole file as lowercase hex.
///
/// Carries the size of every snapshot file so progress can be reported in
/// bytes hashed.
#[derive(Debug, Clone)]
pub struct HashMetric {
    hasher: Hasher,
    sizes: Vec<u64>,
}

impl HashMetric {
    /// Create a hash metric over files with the given sizes.
    #[must_use]
    pub fn new(hasher: Hasher, sizes: Vec<u64>) -> Self {
        Self { hasher, sizes }
    }

    /// Move the file sizes out of the metric.
    pub fn take_sizes(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.sizes)
    }
}

impl FileMetric for HashMetric {
    type Value = String;

    fn compute(&self, path: &Path) -> Result<String, StageError> {
        self.hasher.hash_hex(path)
    }

    fn parse(&self, line: &str) -> Option<String> {
        let line = line.trim();
        is_hex_digest(line).then(|| line.to_string())
    }

    fn bytes(&self, index: usize, _value: &String) -> u64 {
        self.sizes.get(index).copied().unwrap_or(0)
    }

    fn check(&self, snapshot: &TreeSnapshot) -> Result<(), StageError> {
        if self.sizes.len() != snapshot.len() {
            return Err(StageError::SizeCountMismatch {
                sizes: self.sizes.len(),
                files: snapshot.len(),
            });
        }
        Ok(())
    }
}

/// Outcome of one [`ResumableStage::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    /// The existing log (if any) was loaded and its tail verified.
    Resumed {
        /// Records already present in the log
        file_count: usize,
        /// Bytes accounted for by those records
        byte_count: u64,
    },
    /// One more file was computed and logged.
    Progress {
        /// Files done so far
        file_count: usize,
        /// Cumulative bytes so far
        byte_count: u64,
    },
    /// Every file in the snapshot has a value.
    Finished,
}

#[derive(Debug)]
enum State {
    Pending,
    Running,
    Finished,
}

/// Resumable stage computing one [`FileMetric`] value per snapshot file.
#[derive(Debug)]
pub struct ResumableStage<M: FileMetric> {
    metric: M,
    log_path: PathBuf,
    verify_tail: usize,
    results: Vec<M::Value>,
    byte_count: u64,
    cursor: Cursor,
    terminated: bool,
    writer: Option<CheckpointWriter>,
    state: State,
}

impl<M: FileMetric> ResumableStage<M> {
    /// Create a stage logging to `log_path`.
    #[must_use]
    pub fn new(metric: M, log_path: &Path) -> Self {
        Self {
            metric,
            log_path: log_path.to_path_buf(),
            verify_tail: DEFAULT_VERIFY_TAIL,
            results: Vec::new(),
            byte_count: 0,
            cursor: Cursor::default(),
            terminated: true,
            writer: None,
            state: State::Pending,
        }
    }

    /// Number of trailing log records recomputed on resume.
    #[must_use]
    pub fn with_verify_tail(mut self, count: usize) -> Self {
        self.verify_tail = count;
        self
    }

    /// Values computed or loaded so far, in snapshot order.
    #[must_use]
    pub fn results(&self) -> &[M::Value] {
        &self.results
    }

    /// Move the results out of the stage.
    pub fn take_results(&mut self) -> Vec<M::Value> {
        std::mem::take(&mut self.results)
    }

    /// Cumulative byte count for the results so far.
    #[must_use]
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// The metric, mutably.
    pub fn metric_mut(&mut self) -> &mut M {
        &mut self.metric
    }

    /// Perform one unit of work.
    ///
    /// The first call loads and verifies the existing log. Each later call
    /// computes, logs and flushes the value for one more file.
    ///
    /// # Errors
    ///
    /// Format, integrity and I/O errors are all fatal; the stage must not be
    /// stepped again after an error.
    pub fn step(&mut self, snapshot: &TreeSnapshot) -> Result<StageStep, StageError> {
        match self.state {
            State::Pending => {
                self.resume(snapshot)?;
                self.state = State::Running;
                Ok(StageStep::Resumed {
                    file_count: self.results.len(),
                    byte_count: self.byte_count,
                })
            }
            State::Running if self.results.len() >= snapshot.len() => {
                self.writer = None;
                self.state = State::Finished;
                Ok(StageStep::Finished)
            }
            State::Running => self.process_next(snapshot),
            State::Finished => Ok(StageStep::Finished),
        }
    }

    fn resume(&mut self, snapshot: &TreeSnapshot) -> Result<(), StageError> {
        self.metric.check(snapshot)?;

        if self.log_path.exists() {
            let loaded = read_log(&self.log_path, |line| self.metric.parse(line))?;
            if loaded.records.len() > snapshot.len() {
                return Err(StageError::TooManyRecords {
                    path: self.log_path.clone(),
                    records: loaded.records.len(),
                    files: snapshot.len(),
                });
            }
            self.verify(snapshot, &loaded.records)?;

            self.byte_count = loaded
                .records
                .iter()
                .enumerate()
                .map(|(i, v)| self.metric.bytes(i, v))
                .sum();
            self.terminated = loaded.terminated;
            self.results = loaded.records;
            log::info!(
                "Resuming {} after {} of {} files",
                self.log_path.display(),
                self.results.len(),
                snapshot.len()
            );
        } else {
            log::debug!("No checkpoint at {}, starting fresh", self.log_path.display());
        }

        self.cursor = snapshot.cursor_at(self.results.len());
        Ok(())
    }

    fn verify(&self, snapshot: &TreeSnapshot, records: &[M::Value]) -> Result<(), StageError> {
        let start = records.len().saturating_sub(self.verify_tail);
        for (index, expected) in records.iter().enumerate().skip(start) {
            let file = snapshot.get(index as isize)?;
            let actual = self.metric.compute(&file)?;
            if actual != *expected {
                return Err(StageError::Integrity {
                    path: self.log_path.clone(),
                    index,
                    file,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
        Ok(())
    }

    fn process_next(&mut self, snapshot: &TreeSnapshot) -> Result<StageStep, StageError> {
        let index = self.results.len();
        let path = snapshot
            .advance(&mut self.cursor)
            .ok_or(SnapshotError::IndexOutOfRange {
                index: index as isize,
                len: snapshot.len(),
            })?;

        let mut writer = match self.writer.take() {
            Some(writer) => writer,
            None => CheckpointWriter::open_append(&self.log_path, self.terminated)?,
        };

        let value = self.metric.compute(&path)?;
        writer.append(&value)?;
        self.writer = Some(writer);
        self.byte_count += self.metric.bytes(index, &value);
        self.results.push(value);

        Ok(StageStep::Progress {
            file_count: self.results.len(),
            byte_count: self.byte_count,
        })
    }
}

/// Errors that can occur while running a checkpointed stage.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// The checkpoint log does not have the expected shape.
    #[error("Malformed checkpoint {path} at line {line}: {reason}")]
    Format {
        /// Log file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// A recomputed value disagrees with the logged one.
    #[error(
        "Checkpoint {path} is stale: file {index} ({file}) was logged as {expected}, now {actual}"
    )]
    Integrity {
        /// Log file
        path: PathBuf,
        /// Global index of the file in the snapshot
        index: usize,
        /// The file that was recomputed
        file: PathBuf,
        /// Value found in the log
        expected: String,
        /// Value computed now
        actual: String,
    },

    /// The log holds more records than the snapshot has files.
    #[error("Checkpoint {path} has {records} records but the snapshot has only {files} files")]
    TooManyRecords {
        /// Log file
        path: PathBuf,
        /// Records in the log
        records: usize,
        /// Files in the snapshot
        files: usize,
    },

    /// The hash stage was given a size list that does not match the snapshot.
    #[error("Integrity error: {sizes} file sizes for {files} files")]
    SizeCountMismatch {
        /// Number of sizes given
        sizes: usize,
        /// Number of files in the snapshot
        files: usize,
    },

    /// Positional access into the snapshot failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An I/O error occurred on a checkpoint log or a scanned file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
