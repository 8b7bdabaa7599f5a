//! Report model: duplicate groups clustered by directory signature.
//!
//! A [`Report`] is a list of [`DupItem`]s. Every item has a fixed tuple of
//! directories (its signature) and one [`DupRow`] per duplicate group whose
//! files live in exactly those directories. A row lists, for each directory
//! of the signature, the names of that group's files in the directory.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Sorted, de-duplicated parent directories of `paths`.
#[must_use]
pub fn directory_signature<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut dirs: Vec<&Path> = paths
        .into_iter()
        .map(|p| p.parent().unwrap_or(p))
        .collect();
    dirs.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    dirs.dedup();
    dirs.into_iter().map(Path::to_path_buf).collect()
}

/// One duplicate group projected onto a directory signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DupRow {
    /// Content hash shared by every file in the row
    pub hash: String,
    /// Size of each copy in bytes
    pub size: u64,
    /// File names per signature directory, in signature order
    pub files: Vec<Vec<String>>,
}

impl DupRow {
    /// Bucket `paths` by parent directory, one bucket per entry of `dirs`.
    ///
    /// Names keep their order within each bucket. Paths whose parent is not
    /// part of `dirs` are ignored; callers always pass the paths' own signature.
    #[must_use]
    pub fn build<'a>(
        dirs: &[PathBuf],
        paths: impl IntoIterator<Item = &'a Path>,
        hash: &str,
        size: u64,
    ) -> Self {
        let mut files = vec![Vec::new(); dirs.len()];
        for path in paths {
            let parent = path.parent().unwrap_or(path);
            if let Some(slot) = dirs.iter().position(|d| d == parent) {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                files[slot].push(name);
            }
        }
        Self {
            hash: hash.to_string(),
            size,
            files,
        }
    }

    /// Total number of files in the row.
    #[must_use]
    pub fn num_files(&self) -> usize {
        self.files.iter().map(Vec::len).sum()
    }

    /// Number of display lines: the largest per-directory bucket.
    #[must_use]
    pub fn height(&self) -> usize {
        self.files.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Bytes that would be freed by keeping a single copy.
    #[must_use]
    pub fn duplicated_bytes(&self) -> u64 {
        self.size * (self.num_files().saturating_sub(1) as u64)
    }

    /// The `idx`-th display line: one optional name per directory column.
    #[must_use]
    pub fn line(&self, idx: usize) -> Vec<Option<&str>> {
        self.files
            .iter()
            .map(|names| names.get(idx).map(String::as_str))
            .collect()
    }
}

/// Duplicate groups sharing one directory signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DupItem {
    dirs: Vec<PathBuf>,
    rows: Vec<DupRow>,
}

impl DupItem {
    /// Start an item from one group's paths.
    #[must_use]
    pub fn create<'a>(paths: impl IntoIterator<Item = &'a Path> + Clone, hash: &str, size: u64) -> Self {
        let dirs = directory_signature(paths.clone());
        let row = DupRow::build(&dirs, paths, hash, size);
        Self {
            dirs,
            rows: vec![row],
        }
    }

    /// Add a group's row if its signature equals this item's.
    ///
    /// Returns `false` and leaves the item untouched otherwise.
    pub fn try_append<'a>(
        &mut self,
        paths: impl IntoIterator<Item = &'a Path> + Clone,
        hash: &str,
        size: u64,
    ) -> bool {
        if directory_signature(paths.clone()) != self.dirs {
            return false;
        }
        self.rows.push(DupRow::build(&self.dirs, paths, hash, size));
        true
    }

    /// The directory signature.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[DupRow] {
        &self.rows
    }

    /// Number of display lines for the whole item.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.iter().map(DupRow::height).sum()
    }
}

/// Finished duplicate report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    items: Vec<DupItem>,
}

impl Report {
    /// Wrap a list of items.
    #[must_use]
    pub fn new(items: Vec<DupItem>) -> Self {
        Self { items }
    }

    /// Items in browsing order.
    #[must_use]
    pub fn items(&self) -> &[DupItem] {
        &self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no duplicates were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of duplicate groups across all items.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.items.iter().map(|item| item.rows.len()).sum()
    }

    /// Sum over every row of `size * (files - 1)`.
    #[must_use]
    pub fn duplicated_bytes(&self) -> u64 {
        self.items
            .iter()
            .flat_map(|item| item.rows.iter())
            .map(DupRow::duplicated_bytes)
            .sum()
    }

    /// Widest directory signature, or 0 for an empty report.
    #[must_use]
    pub fn max_columns(&self) -> usize {
        self.items.iter().map(|item| item.dirs.len()).max().unwrap_or(0)
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<DupItem> {
        &mut self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_directory_signature_sorted_and_distinct() {
        let p = paths(&["/y/a", "/x/b", "/y/c"]);
        let sig = directory_signature(p.iter().map(PathBuf::as_path));
        assert_eq!(sig, paths(&["/x", "/y"]));
    }

    #[test]
    fn test_row_buckets_by_directory() {
        let p = paths(&["/y/a", "/x/b", "/y/c"]);
        let dirs = paths(&["/x", "/y"]);
        let row = DupRow::build(&dirs, p.iter().map(PathBuf::as_path), "h", 10);

        assert_eq!(row.files, vec![vec!["b".to_string()], vec!["a".into(), "c".into()]]);
        assert_eq!(row.num_files(), 3);
        assert_eq!(row.height(), 2);
        assert_eq!(row.line(0), vec![Some("b"), Some("a")]);
        assert_eq!(row.line(1), vec![None, Some("c")]);
        assert_eq!(row.duplicated_bytes(), 20);
    }

    #[test]
    fn test_item_rejects_other_signature() {
        let first = paths(&["/x/a", "/y/a"]);
        let other = paths(&["/x/b", "/z/b"]);
        let same = paths(&["/y/c", "/x/c"]);

        let mut item = DupItem::create(first.iter().map(PathBuf::as_path), "h1", 1);
        assert!(!item.try_append(other.iter().map(PathBuf::as_path), "h2", 1));
        assert!(item.try_append(same.iter().map(PathBuf::as_path), "h3", 1));

        assert_eq!(item.dirs(), paths(&["/x", "/y"]).as_slice());
        assert_eq!(item.rows().len(), 2);
        assert_eq!(item.height(), 2);
    }

    #[test]
    fn test_duplicated_bytes() {
        let two = paths(&["/x/a", "/y/a"]);
        let three = paths(&["/x/b", "/y/b", "/y/c"]);
        let report = Report::new(vec![
            DupItem::create(two.iter().map(PathBuf::as_path), "h1", 9),
            DupItem::create(three.iter().map(PathBuf::as_path), "h2", 9),
        ]);

        assert_eq!(report.duplicated_bytes(), 9 + 18);
        assert_eq!(report.group_count(), 2);
        assert_eq!(report.max_columns(), 2);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::default();
        assert!(report.is_empty());
        assert_eq!(report.max_columns(), 0);
        assert_eq!(report.duplicated_bytes(), 0);
    }
}
