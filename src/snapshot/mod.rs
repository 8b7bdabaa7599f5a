//! Flattened, randomly-addressable snapshot of one or more directory trees.
//!
//! # Overview
//!
//! A [`TreeSnapshot`] is an ordered list of [`DirectoryListing`]s. Each listing
//! holds an absolute directory path and the bare names of the files directly
//! inside it. Files are addressed by a single global index that runs through
//! the listings in order, so later stages can store exactly one value per file
//! in a plain line-oriented log and map line `i` back to a path.
//!
//! # Architecture
//!
//! * [`walker`]: Builds a snapshot from the filesystem, one listing per step.
//! * [`io`]: Saves and loads the `file_walk.txt` format.
//!
//! # Example
//!
//! ```
//! use dupwalk::snapshot::{DirectoryListing, TreeSnapshot};
//!
//! let mut snapshot = TreeSnapshot::new();
//! snapshot.push(DirectoryListing::new("/a", vec!["a1".into(), "a2".into()]).unwrap());
//! snapshot.push(DirectoryListing::new("/b", vec!["b1".into()]).unwrap());
//!
//! assert_eq!(snapshot.len(), 3);
//! assert_eq!(snapshot.get(-1).unwrap(), std::path::PathBuf::from("/b/b1"));
//! ```

pub mod io;
pub mod walker;

use std::path::{Path, PathBuf};

pub use walker::{WalkStep, WalkTask};

/// One directory and the file names directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    folder: String,
    files: Vec<String>,
}

impl DirectoryListing {
    /// Create a listing, validating the directory path and every file name.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidDirectory`] if `folder` is not absolute
    /// or contains a line break, and [`SnapshotError::InvalidFileName`] if a
    /// name is empty, contains a path separator or contains a line break.
    pub fn new(folder: impl Into<String>, files: Vec<String>) -> Result<Self, SnapshotError> {
        let folder = folder.into();
        if !Path::new(&folder).is_absolute() || folder.contains(['\n', '\r']) {
            return Err(SnapshotError::InvalidDirectory(folder));
        }
        if let Some(name) = files.iter().find(|name| !is_valid_file_name(name)) {
            return Err(SnapshotError::InvalidFileName {
                folder,
                name: name.clone(),
            });
        }
        Ok(Self { folder, files })
    }

    /// Absolute path of the directory.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Bare file names, in listing order.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Number of files in this listing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the directory holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Absolute path of the file at `offset` within this listing.
    #[must_use]
    pub fn path_of(&self, offset: usize) -> Option<PathBuf> {
        self.files
            .get(offset)
            .map(|name| Path::new(&self.folder).join(name))
    }
}

fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', std::path::MAIN_SEPARATOR, '\n', '\r'])
        && !Path::new(name).is_absolute()
}

/// Position of a file inside a snapshot: listing index plus offset in that listing.
///
/// A cursor is plain data, so a long-running stage can keep it between steps
/// without borrowing the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    listing: usize,
    offset: usize,
}

impl Cursor {
    /// Index of the listing the cursor points into.
    #[must_use]
    pub fn listing(&self) -> usize {
        self.listing
    }

    /// Offset of the file within its listing.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Ordered sequence of directory listings with a global file index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    listings: Vec<DirectoryListing>,
    file_count: usize,
}

impl TreeSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from already validated listings.
    #[must_use]
    pub fn from_listings(listings: Vec<DirectoryListing>) -> Self {
        let file_count = listings.iter().map(DirectoryListing::len).sum();
        Self {
            listings,
            file_count,
        }
    }

    /// Walk the given roots and collect every directory listing.
    ///
    /// This runs a [`WalkTask`] to completion. Interactive callers should
    /// drive the task step by step instead.
    ///
    /// # Errors
    ///
    /// Returns the first walk or validation error encountered.
    pub fn from_walk<P: AsRef<Path>>(roots: &[P]) -> Result<Self, SnapshotError> {
        let mut task = WalkTask::new(roots.iter().map(|r| r.as_ref().to_path_buf()).collect());
        while let WalkStep::Listing { .. } = task.step()? {}
        Ok(task.into_snapshot())
    }

    /// Append a listing discovered by an in-progress walk.
    pub fn push(&mut self, listing: DirectoryListing) {
        self.file_count += listing.len();
        self.listings.push(listing);
    }

    /// Total number of files across all listings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.file_count
    }

    /// Check if the snapshot holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }

    /// Number of directory listings.
    #[must_use]
    pub fn folder_count(&self) -> usize {
        self.listings.len()
    }

    /// All listings in order.
    #[must_use]
    pub fn listings(&self) -> &[DirectoryListing] {
        &self.listings
    }

    /// Absolute path of the file at a global index.
    ///
    /// Negative indices count from the end, so `-1` is the last file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::IndexOutOfRange`] unless `-len <= index < len`.
    pub fn get(&self, index: isize) -> Result<PathBuf, SnapshotError> {
        let cursor = self.locate(index)?;
        Ok(self.listings[cursor.listing]
            .path_of(cursor.offset)
            .unwrap_or_default())
    }

    /// Resolve a global index (negative counts from the end) to a cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::IndexOutOfRange`] unless `-len <= index < len`.
    pub fn locate(&self, index: isize) -> Result<Cursor, SnapshotError> {
        let len = self.file_count;
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index.unsigned_abs())
        };
        match resolved {
            Some(global) if global < len => Ok(self.cursor_at(global)),
            _ => Err(SnapshotError::IndexOutOfRange { index, len }),
        }
    }

    /// Cursor positioned at global index `skip`, or past the end if `skip >= len`.
    #[must_use]
    pub fn cursor_at(&self, skip: usize) -> Cursor {
        let mut remaining = skip;
        for (listing, dir) in self.listings.iter().enumerate() {
            if remaining < dir.len() {
                return Cursor {
                    listing,
                    offset: remaining,
                };
            }
            remaining -= dir.len();
        }
        Cursor {
            listing: self.listings.len(),
            offset: 0,
        }
    }

    /// Return the path under `cursor` and move the cursor to the next file.
    pub fn advance(&self, cursor: &mut Cursor) -> Option<PathBuf> {
        while let Some(dir) = self.listings.get(cursor.listing) {
            if let Some(path) = dir.path_of(cursor.offset) {
                cursor.offset += 1;
                return Some(path);
            }
            cursor.listing += 1;
            cursor.offset = 0;
        }
        None
    }

    /// Iterate over every file path, listing by listing.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        self.tail(0)
    }

    /// Iterate over file paths starting at global index `skip`.
    #[must_use]
    pub fn tail(&self, skip: usize) -> Iter<'_> {
        Iter {
            snapshot: self,
            cursor: self.cursor_at(skip),
        }
    }
}

impl<'a> IntoIterator for &'a TreeSnapshot {
    type Item = PathBuf;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the absolute file paths of a [`TreeSnapshot`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    snapshot: &'a TreeSnapshot,
    cursor: Cursor,
}

impl Iterator for Iter<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        self.snapshot.advance(&mut self.cursor)
    }
}

/// Errors produced while building, indexing or persisting a snapshot.
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    /// A directory path is not absolute or cannot be stored on one line.
    #[error("Invalid directory path: {0:?}")]
    InvalidDirectory(String),

    /// A file name is empty, contains a separator or a line break.
    #[error("Invalid file name {name:?} in {folder}")]
    InvalidFileName {
        /// Directory holding the file
        folder: String,
        /// The rejected name
        name: String,
    },

    /// A path is not valid UTF-8 and cannot be written to the walk log.
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// A root given to the walk is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Positional access outside `[-len, len)`.
    #[error("Index {index} out of range for snapshot of {len} files")]
    IndexOutOfRange {
        /// Requested index
        index: isize,
        /// Number of files in the snapshot
        len: usize,
    },

    /// The walk log does not have the expected shape.
    #[error("Malformed walk log {path} at line {line}: {reason}")]
    Format {
        /// Log file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// The filesystem walk failed.
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// An I/O error occurred while reading or writing the walk log.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
