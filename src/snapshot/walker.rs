//! Incremental directory walk producing one [`DirectoryListing`] per step.
//!
//! # Overview
//!
//! [`WalkTask`] walks each root depth-first with [`walkdir`]. Entries of every
//! directory are sorted so that plain files come before subdirectories, both
//! in name order. That makes a directory's files arrive immediately after the
//! directory itself, so a listing is complete as soon as the next directory
//! entry shows up and can be handed out without buffering the whole tree.
//!
//! Each call to [`WalkTask::step`] returns after at most one listing, which is
//! the suspension point an interactive host needs.
//!
//! # Example
//!
//! ```no_run
//! use dupwalk::snapshot::{WalkStep, WalkTask};
//! use std::path::PathBuf;
//!
//! let mut task = WalkTask::new(vec![PathBuf::from("/home/user/photos")]);
//! while let WalkStep::Listing { folder_count, file_count } = task.step().unwrap() {
//!     println!("{folder_count} folders, {file_count} files");
//! }
//! let snapshot = task.into_snapshot();
//! ```

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{DirectoryListing, SnapshotError, TreeSnapshot};

/// Outcome of one [`WalkTask::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStep {
    /// One more listing was appended to the snapshot.
    Listing {
        /// Listings collected so far
        folder_count: usize,
        /// Files collected so far
        file_count: usize,
    },
    /// Every root has been walked.
    Finished,
}

/// Resumable-by-steps walk over a list of root directories.
pub struct WalkTask {
    roots: VecDeque<PathBuf>,
    current: Option<walkdir::IntoIter>,
    pending: Option<(String, Vec<String>)>,
    follow_symlinks: bool,
    snapshot: TreeSnapshot,
}

impl std::fmt::Debug for WalkTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkTask")
            .field("roots", &self.roots)
            .field("walking", &self.current.is_some())
            .field("pending", &self.pending.as_ref().map(|(folder, _)| folder))
            .field("follow_symlinks", &self.follow_symlinks)
            .field("folder_count", &self.snapshot.folder_count())
            .field("file_count", &self.snapshot.len())
            .finish()
    }
}

impl WalkTask {
    /// Create a walk over `roots`, visited in the given order.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: roots.into(),
            current: None,
            pending: None,
            follow_symlinks: false,
            snapshot: TreeSnapshot::new(),
        }
    }

    /// Follow symbolic links instead of skipping them.
    ///
    /// Warning: May visit the same files more than once.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Consume the task and return the collected snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> TreeSnapshot {
        self.snapshot
    }

    /// Move the collected snapshot out, leaving an empty one behind.
    pub fn take_snapshot(&mut self) -> TreeSnapshot {
        std::mem::take(&mut self.snapshot)
    }

    /// Advance the walk until one listing is complete or the walk ends.
    ///
    /// # Errors
    ///
    /// Any walk, validation or encoding error is fatal to the walk.
    pub fn step(&mut self) -> Result<WalkStep, SnapshotError> {
        loop {
            if self.current.is_none() {
                match self.roots.pop_front() {
                    Some(root) => self.current = Some(self.open(&root)?),
                    None => return Ok(self.emit_pending()?.unwrap_or(WalkStep::Finished)),
                }
            }

            let next = self.current.as_mut().and_then(Iterator::next);
            let entry = match next {
                Some(entry) => entry?,
                None => {
                    self.current = None;
                    match self.emit_pending()? {
                        Some(step) => return Ok(step),
                        None => continue,
                    }
                }
            };

            if entry.file_type().is_dir() {
                let folder = utf8(entry.path())?;
                let finished = self.pending.replace((folder, Vec::new()));
                if let Some((folder, files)) = finished {
                    return self.emit(folder, files);
                }
            } else if entry.path_is_symlink() && !self.follow_symlinks {
                log::debug!("Skipping symlink: {}", entry.path().display());
            } else if !entry.file_type().is_file() {
                // FIFOs, sockets and devices would block or never end when read.
                log::debug!("Skipping special file: {}", entry.path().display());
            } else {
                let name = utf8(Path::new(entry.file_name()))?;
                match self.pending.as_mut() {
                    Some((_, files)) => files.push(name),
                    None => return Err(SnapshotError::NotADirectory(entry.into_path())),
                }
            }
        }
    }

    fn open(&self, root: &Path) -> Result<walkdir::IntoIter, SnapshotError> {
        let absolute = std::path::absolute(root).map_err(|source| SnapshotError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        // Drop trailing separators and `.` components so headers match `Path::parent`.
        let root: PathBuf = absolute.components().collect();
        log::debug!("Walking {}", root.display());

        Ok(WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by(files_first)
            .into_iter())
    }

    fn emit_pending(&mut self) -> Result<Option<WalkStep>, SnapshotError> {
        match self.pending.take() {
            Some((folder, files)) => self.emit(folder, files).map(Some),
            None => Ok(None),
        }
    }

    fn emit(&mut self, folder: String, files: Vec<String>) -> Result<WalkStep, SnapshotError> {
        self.snapshot.push(DirectoryListing::new(folder, files)?);
        Ok(WalkStep::Listing {
            folder_count: self.snapshot.folder_count(),
            file_count: self.snapshot.len(),
        })
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn utf8(path: &Path) -> Result<String, SnapshotError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| SnapshotError::NonUtf8Path(path.to_path_buf()))
}
