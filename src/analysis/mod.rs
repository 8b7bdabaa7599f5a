//! Duplicate analysis: grouping hashed files into a browsable report.
//!
//! # Architecture
//!
//! * [`grouping`]: The step-wise [`GroupingTask`] turning parallel
//!   hash/path/size sequences into a [`Report`].
//! * [`report`]: The [`Report`], [`DupItem`] and [`DupRow`] model handed to
//!   the rendering side.
//!
//! # Example
//!
//! ```
//! use dupwalk::analysis::analyse;
//! use std::path::PathBuf;
//!
//! let hashes = vec!["h1".to_string(), "h1".to_string(), "h2".to_string()];
//! let paths = vec![
//!     PathBuf::from("/x/a"),
//!     PathBuf::from("/y/a"),
//!     PathBuf::from("/y/b"),
//! ];
//! let sizes = vec![9, 9, 3];
//!
//! let report = analyse(hashes, paths, sizes, Vec::new()).unwrap();
//! assert_eq!(report.len(), 1);
//! assert_eq!(report.duplicated_bytes(), 9);
//! ```

pub mod grouping;
pub mod report;

use std::path::PathBuf;

pub use grouping::{GroupingStep, GroupingTask, DEFAULT_YIELD_INTERVAL};
pub use report::{directory_signature, DupItem, DupRow, Report};

/// Group files into a duplicate report in one go.
///
/// # Errors
///
/// Returns [`AnalysisError::LengthMismatch`] if the sequences differ in length
/// and [`AnalysisError::HashCollision`] if files sharing a hash differ in size.
pub fn analyse(
    hashes: Vec<String>,
    paths: Vec<PathBuf>,
    sizes: Vec<u64>,
    ignored: Vec<PathBuf>,
) -> Result<Report, AnalysisError> {
    GroupingTask::new(hashes, paths, sizes, ignored)?.run()
}

/// Errors that can occur during duplicate analysis.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    /// The hash, path and size sequences are not parallel.
    #[error(
        "Integrity error: {hashes} hashes, {paths} files and {sizes} sizes must all be equal"
    )]
    LengthMismatch {
        /// Number of hashes
        hashes: usize,
        /// Number of paths
        paths: usize,
        /// Number of sizes
        sizes: usize,
    },

    /// Two files share a content hash but not a size.
    #[error(
        "Hash collision: {path} ({size} bytes) has hash {hash} like {other} ({other_size} bytes)"
    )]
    HashCollision {
        /// Shared hash
        hash: String,
        /// File that revealed the collision
        path: PathBuf,
        /// Its size
        size: u64,
        /// First file seen with this hash
        other: PathBuf,
        /// Its size
        other_size: u64,
    },
}
