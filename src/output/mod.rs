//! Report formatters.
//!
//! - [`text`]: aligned plain-text listing, one block per directory signature
//! - [`json`]: the report and a [`Summary`] as one JSON document
//!
//! # Example
//!
//! ```
//! use dupwalk::analysis::analyse;
//! use dupwalk::output::{text::TextOutput, Summary};
//! use std::path::PathBuf;
//!
//! let report = analyse(
//!     vec!["h".into(), "h".into()],
//!     vec![PathBuf::from("/x/a"), PathBuf::from("/y/a")],
//!     vec![9, 9],
//!     Vec::new(),
//! )
//! .unwrap();
//! let summary = Summary::new(&report, 2, 18);
//!
//! let mut out = Vec::new();
//! TextOutput::new(&report, &summary).write_to(&mut out).unwrap();
//! ```

pub mod json;
pub mod text;

use serde::Serialize;

use crate::analysis::{DupRow, Report};

pub use json::JsonOutput;
pub use text::TextOutput;

/// Totals printed alongside a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Files in the snapshot
    pub total_files: usize,
    /// Sum of all file sizes in bytes
    pub total_size: u64,
    /// Number of directory signatures with duplicates
    pub duplicate_items: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Files beyond the first copy of each group
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy of each group
    pub duplicated_bytes: u64,
}

impl Summary {
    /// Summarize `report` over a scan of `total_files` files and `total_size` bytes.
    #[must_use]
    pub fn new(report: &Report, total_files: usize, total_size: u64) -> Self {
        let rows = || report.items().iter().flat_map(|item| item.rows());
        Self {
            total_files,
            total_size,
            duplicate_items: report.len(),
            duplicate_groups: report.group_count(),
            duplicate_files: rows().map(|row| row.num_files().saturating_sub(1)).sum(),
            duplicated_bytes: rows().map(DupRow::duplicated_bytes).sum(),
        }
    }
}

/// Errors that can occur while writing a report.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing to the output stream failed
    #[error("I/O error while writing the report: {0}")]
    Io(#[from] std::io::Error),
}
