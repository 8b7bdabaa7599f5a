//! Persistence of a [`TreeSnapshot`] as a plain-text walk log.
//!
//! The format is one absolute directory path per header line, followed by one
//! line per file name in that directory:
//!
//! ```text
//! /home/user/photos
//! a.jpg
//! b.jpg
//! /home/user/photos/2019
//! c.jpg
//! ```
//!
//! Header lines are recognised by being absolute paths. File names can never
//! be absolute, so the two kinds of line cannot be confused.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{DirectoryListing, SnapshotError, TreeSnapshot};

impl TreeSnapshot {
    /// Write the snapshot to `path`, replacing any existing file.
    ///
    /// The log is written to a sibling `.tmp` file, synced, then renamed onto
    /// `path`, so `path` is either absent or complete.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be created, written or
    /// renamed.
    pub fn save_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let tmp_path = temp_path(path);
        let io_err = |source| SnapshotError::Io {
            path: tmp_path.clone(),
            source,
        };

        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        for listing in self.listings() {
            writeln!(writer, "{}", listing.folder()).map_err(io_err)?;
            for name in listing.files() {
                writeln!(writer, "{name}").map_err(io_err)?;
            }
        }
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp_path, path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!(
            "Saved walk of {} files in {} folders to {}",
            self.len(),
            self.folder_count(),
            path.display()
        );
        Ok(())
    }

    /// Read a snapshot previously written by [`TreeSnapshot::save_to`].
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Format`] for a file name line before the first
    /// header, an empty line, or an invalid entry, and [`SnapshotError::Io`]
    /// if the file cannot be read.
    pub fn load_from(path: &Path) -> Result<Self, SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };
        let format_err = |line: usize, reason: String| SnapshotError::Format {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let reader = BufReader::new(File::open(path).map_err(io_err)?);
        let mut snapshot = TreeSnapshot::new();
        // (header line number, directory, file names)
        let mut current: Option<(usize, String, Vec<String>)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(io_err)?;
            if line.is_empty() {
                return Err(format_err(line_no, "empty line".to_string()));
            }

            if Path::new(&line).is_absolute() {
                if let Some((header_no, folder, files)) = current.take() {
                    snapshot.push(
                        DirectoryListing::new(folder, files)
                            .map_err(|e| format_err(header_no, e.to_string()))?,
                    );
                }
                current = Some((line_no, line, Vec::new()));
            } else {
                match current.as_mut() {
                    Some((_, _, files)) => files.push(line),
                    None => {
                        return Err(format_err(
                            line_no,
                            format!("file name {line:?} before any directory header"),
                        ))
                    }
                }
            }
        }

        if let Some((header_no, folder, files)) = current {
            snapshot.push(
                DirectoryListing::new(folder, files)
                    .map_err(|e| format_err(header_no, e.to_string()))?,
            );
        }

        log::debug!(
            "Loaded walk of {} files in {} folders from {}",
            snapshot.len(),
            snapshot.folder_count(),
            path.display()
        );
        Ok(snapshot)
    }
}

/// `file_walk.txt` -> `file_walk.txt.tmp`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn listing(folder: &str, files: &[&str]) -> DirectoryListing {
        DirectoryListing::new(folder, files.iter().map(|f| f.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_save_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_walk.txt");
        let snapshot = TreeSnapshot::from_listings(vec![
            listing("/a", &["a1", "a2"]),
            listing("/a/sub", &[]),
            listing("/b", &["b1"]),
        ]);

        snapshot.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "/a\na1\na2\n/a/sub\n/b\nb1\n");
    }

    #[test]
    fn test_save_replaces_existing_log_without_leaving_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_walk.txt");
        std::fs::write(&path, "/stale\nold\n").unwrap();
        std::fs::write(dir.path().join("file_walk.txt.tmp"), "/half\nwrit").unwrap();

        TreeSnapshot::from_listings(vec![listing("/a", &["a1"])])
            .save_to(&path)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/a\na1\n");
        assert!(!dir.path().join("file_walk.txt.tmp").exists());
    }

    #[test]
    fn test_round_trip_keeps_empty_listings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_walk.txt");
        let snapshot = TreeSnapshot::from_listings(vec![
            listing("/root", &[]),
            listing("/root/x", &["one", "two", "three"]),
            listing("/root/y", &[]),
        ]);

        snapshot.save_to(&path).unwrap();
        let loaded = TreeSnapshot::load_from(&path).unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.folder_count(), 3);
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_load_rejects_leading_file_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_walk.txt");
        std::fs::write(&path, "orphan.txt\n/a\na1\n").unwrap();

        let err = TreeSnapshot::load_from(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Format { line: 1, .. }));
    }

    #[test]
    fn test_load_rejects_empty_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_walk.txt");
        std::fs::write(&path, "/a\na1\n\na2\n").unwrap();

        let err = TreeSnapshot::load_from(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Format { line: 3, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = TreeSnapshot::load_from(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_walk.txt");
        std::fs::write(&path, "").unwrap();

        let loaded = TreeSnapshot::load_from(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.folder_count(), 0);
    }
}
