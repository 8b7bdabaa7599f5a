//! Plain-text report.
//!
//! Every item prints its directory signature as a numbered header followed
//! by one block per row. Each block lists the row's files in columns, one
//! column per directory, padded so the columns line up within the item:
//!
//! ```text
//! [1] 2 groups in 2 directories
//!     (1) /home/me/photos
//!     (2) /mnt/backup/photos
//!   9 B x 3  af13b2c0d1e4
//!     a.jpg  | a.jpg
//!            | a copy.jpg
//! ```

use std::io::Write;

use bytesize::ByteSize;

use super::{OutputError, Summary};
use crate::analysis::{DupItem, Report};

const SEPARATOR: &str = " | ";
const HASH_PREFIX_LEN: usize = 12;

/// Text formatter borrowing a report.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    report: &'a Report,
    summary: &'a Summary,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter.
    #[must_use]
    pub fn new(report: &'a Report, summary: &'a Summary) -> Self {
        Self { report, summary }
    }

    /// Write the whole report and a closing summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        if self.report.is_empty() {
            writeln!(writer, "No duplicates found in {} files.", self.summary.total_files)?;
            return Ok(());
        }

        for (number, item) in self.report.items().iter().enumerate() {
            write_item(writer, number + 1, item)?;
        }
        writeln!(
            writer,
            "{} duplicate groups in {} directory sets, {} files, {} duplicated ({} scanned in {} files)",
            self.summary.duplicate_groups,
            self.summary.duplicate_items,
            self.summary.duplicate_files,
            ByteSize::b(self.summary.duplicated_bytes),
            ByteSize::b(self.summary.total_size),
            self.summary.total_files,
        )?;
        Ok(())
    }
}

fn write_item<W: Write>(writer: &mut W, number: usize, item: &DupItem) -> std::io::Result<()> {
    writeln!(
        writer,
        "[{number}] {} groups in {} directories",
        item.rows().len(),
        item.dirs().len()
    )?;
    for (column, dir) in item.dirs().iter().enumerate() {
        writeln!(writer, "    ({}) {}", column + 1, dir.display())?;
    }

    let widths = column_widths(item);
    for row in item.rows() {
        let hash = row.hash.get(..HASH_PREFIX_LEN).unwrap_or(&row.hash);
        writeln!(
            writer,
            "  {} x {}  {hash}",
            ByteSize::b(row.size),
            row.num_files()
        )?;
        for idx in 0..row.height() {
            let cells: Vec<String> = row
                .line(idx)
                .iter()
                .zip(&widths)
                .map(|(name, &width)| format!("{:<width$}", name.unwrap_or("")))
                .collect();
            writeln!(writer, "    {}", cells.join(SEPARATOR).trim_end())?;
        }
    }
    writeln!(writer)
}

/// Widest file name per directory column across all rows of an item.
fn column_widths(item: &DupItem) -> Vec<usize> {
    let mut widths = vec![0; item.dirs().len()];
    for row in item.rows() {
        for (width, names) in widths.iter_mut().zip(&row.files) {
            let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
            *width = (*width).max(longest);
        }
    }
    widths
}
