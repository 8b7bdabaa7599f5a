//! Append-only, line-per-record checkpoint logs.
//!
//! A checkpoint log stores one value per snapshot file, in snapshot order, one
//! value per line. Every record is flushed as soon as it is written, so a
//! killed process leaves a log that is a valid prefix, possibly followed by a
//! single unterminated record. Unterminated records are handed back to the
//! caller like any other: the resume check recomputes the last few values and
//! rejects a truncated one.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::StageError;

/// Records read back from an existing checkpoint log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLog<T> {
    /// Parsed records, in file order.
    pub records: Vec<T>,
    /// Whether the file ends with a line break (or is empty).
    pub terminated: bool,
}

/// Read every record of the log at `path`.
///
/// `parse` turns one line (without its line break) into a value; `None` marks
/// the line as malformed.
///
/// # Errors
///
/// Returns [`StageError::Format`] for an empty or unparsable line and
/// [`StageError::Io`] if the file cannot be read.
pub fn read_log<T>(
    path: &Path,
    mut parse: impl FnMut(&str) -> Option<T>,
) -> Result<LoadedLog<T>, StageError> {
    let content = std::fs::read_to_string(path).map_err(|source| StageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let value = parse(line).ok_or_else(|| StageError::Format {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: format!("unparsable record {line:?}"),
        })?;
        records.push(value);
    }

    Ok(LoadedLog {
        records,
        terminated: content.is_empty() || content.ends_with('\n'),
    })
}

/// Writer appending one flushed line per record.
#[derive(Debug)]
pub struct CheckpointWriter {
    file: File,
    path: PathBuf,
}

impl CheckpointWriter {
    /// Open `path` for appending, creating it if missing.
    ///
    /// If `terminated` is false the existing last record lacks its line break,
    /// and one is written first so the next record starts on a fresh line.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Io`] if the file cannot be opened or written.
    pub fn open_append(path: &Path, terminated: bool) -> Result<Self, StageError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StageError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let mut writer = Self {
            file,
            path: path.to_path_buf(),
        };
        if !terminated {
            log::warn!("Terminating last record of {}", path.display());
            writer.write_line("")?;
        }
        Ok(writer)
    }

    /// Append one record and flush it.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Io`] if the write or flush fails.
    pub fn append(&mut self, record: &impl Display) -> Result<(), StageError> {
        self.write_line(&record.to_string())
    }

    fn write_line(&mut self, text: &str) -> Result<(), StageError> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        // One write per record: value and line break go out together.
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| StageError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse_u64(line: &str) -> Option<u64> {
        line.parse().ok()
    }

    #[test]
    fn test_append_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sizes.txt");

        let mut writer = CheckpointWriter::open_append(&path, true).unwrap();
        writer.append(&10u64).unwrap();
        writer.append(&20u64).unwrap();
        drop(writer);

        let loaded = read_log(&path, parse_u64).unwrap();
        assert_eq!(loaded.records, vec![10, 20]);
        assert!(loaded.terminated);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "10\n20\n");
    }

    #[test]
    fn test_unterminated_record_is_closed_before_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sizes.txt");
        std::fs::write(&path, "10\n20").unwrap();

        let loaded = read_log(&path, parse_u64).unwrap();
        assert_eq!(loaded.records, vec![10, 20]);
        assert!(!loaded.terminated);

        let mut writer = CheckpointWriter::open_append(&path, loaded.terminated).unwrap();
        writer.append(&30u64).unwrap();
        drop(writer);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "10\n20\n30\n");
    }

    #[test]
    fn test_read_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sizes.txt");
        std::fs::write(&path, "10\nten\n").unwrap();

        let err = read_log(&path, parse_u64).unwrap_err();
        assert!(matches!(err, StageError::Format { line: 2, .. }));
    }

    #[test]
    fn test_read_rejects_blank_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sizes.txt");
        std::fs::write(&path, "10\n\n20\n").unwrap();

        let err = read_log(&path, parse_u64).unwrap_err();
        assert!(matches!(err, StageError::Format { line: 2, .. }));
    }

    #[test]
    fn test_read_empty_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hashes.txt");
        std::fs::write(&path, "").unwrap();

        let loaded = read_log(&path, parse_u64).unwrap();
        assert!(loaded.records.is_empty());
        assert!(loaded.terminated);
    }
}
