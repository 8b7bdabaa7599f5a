//! JSON output for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "items": [
//!     {
//!       "dirs": ["/x", "/y"],
//!       "rows": [
//!         { "hash": "af13...", "size": 1024, "files": [["a.jpg"], ["a.jpg", "a copy.jpg"]] }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "total_size": 1048576,
//!     "duplicate_items": 1,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 2,
//!     "duplicated_bytes": 2048
//!   },
//!   "exit_code": 0,
//!   "exit_code_name": "DW000"
//! }
//! ```
//!
//! `files` holds one list per entry of `dirs`, in the same order.

use std::io::Write;

use serde::Serialize;

use super::{OutputError, Summary};
use crate::analysis::{DupItem, Report};
use crate::error::ExitCode;

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Items in browsing order
    pub items: &'a [DupItem],
    /// Totals
    pub summary: Summary,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DW000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonOutput<'a> {
    /// Wrap a report for serialization.
    #[must_use]
    pub fn new(report: &'a Report, summary: Summary, exit_code: ExitCode) -> Self {
        Self {
            items: report.items(),
            summary,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Serialize to a pretty-printed string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
