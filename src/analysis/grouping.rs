//! Step-wise duplicate grouping.
//!
//! # Algorithm
//!
//! 1. **Index**: one pass over every file, mapping hash to the indices of its
//!    files (first-seen order) and checking that all files with one hash have
//!    the same size. Runs in chunks of `yield_interval` files.
//! 2. **Rotate**: for every hash with several files, drop files under an
//!    ignored directory, discard the group if fewer than two files remain,
//!    and record every cyclic rotation of the surviving file list.
//! 3. **Sort**: order all rotations by their first path.
//! 4. **Cluster**: walk the sorted rotations; the first rotation of each hash
//!    places the group, either as a new row of the current item (same
//!    directory signature) or as a new item.
//!
//! Sorting rotations by their leading path puts groups that share a leading
//! file's directory next to each other, which is what lets a single linear
//! pass cluster them. A rotation is stored as `(group, start offset)`, so a
//! group of `k` files costs `k` entries rather than `k * k` paths.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::report::{DupItem, Report};
use super::AnalysisError;

/// Files processed per step of the index pass.
pub const DEFAULT_YIELD_INTERVAL: usize = 1000;

/// Outcome of one [`GroupingTask::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupingStep {
    /// Part of the index pass is done.
    Progress {
        /// Files indexed so far
        file_count: usize,
    },
    /// A phase boundary (rotate, sort, cluster) was crossed.
    Boundary,
    /// Grouping is complete.
    Finished(Report),
}

#[derive(Debug)]
struct HashGroup {
    hash: String,
    size: u64,
    members: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Rotation {
    group: usize,
    start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Index,
    Rotate,
    Sort,
    Cluster,
    Done,
}

/// Incremental duplicate grouping over parallel hash/path/size sequences.
#[derive(Debug)]
pub struct GroupingTask {
    hashes: Vec<String>,
    paths: Vec<PathBuf>,
    sizes: Vec<u64>,
    ignored: Vec<PathBuf>,
    yield_interval: usize,
    phase: Phase,
    next: usize,
    groups: Vec<HashGroup>,
    by_hash: HashMap<String, usize>,
    rotations: Vec<Rotation>,
}

impl GroupingTask {
    /// Create a grouping task.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::LengthMismatch`] unless the three sequences
    /// have the same length.
    pub fn new(
        hashes: Vec<String>,
        paths: Vec<PathBuf>,
        sizes: Vec<u64>,
        ignored: Vec<PathBuf>,
    ) -> Result<Self, AnalysisError> {
        if hashes.len() != paths.len() || hashes.len() != sizes.len() {
            return Err(AnalysisError::LengthMismatch {
                hashes: hashes.len(),
                paths: paths.len(),
                sizes: sizes.len(),
            });
        }
        Ok(Self {
            hashes,
            paths,
            sizes,
            ignored,
            yield_interval: DEFAULT_YIELD_INTERVAL,
            phase: Phase::Index,
            next: 0,
            groups: Vec::new(),
            by_hash: HashMap::new(),
            rotations: Vec::new(),
        })
    }

    /// Number of files indexed per step (minimum 1).
    #[must_use]
    pub fn with_yield_interval(mut self, interval: usize) -> Self {
        self.yield_interval = interval.max(1);
        self
    }

    /// Total number of input files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if there are no input files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Perform one slice of work.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::HashCollision`] when two files share a hash
    /// but not a size. The task must not be stepped again after an error.
    pub fn step(&mut self) -> Result<GroupingStep, AnalysisError> {
        match self.phase {
            Phase::Index => self.index_chunk(),
            Phase::Rotate => {
                self.rotate();
                self.phase = Phase::Sort;
                Ok(GroupingStep::Boundary)
            }
            Phase::Sort => {
                let paths = &self.paths;
                let groups = &self.groups;
                self.rotations.sort_by(|a, b| {
                    let pa = &paths[groups[a.group].members[a.start]];
                    let pb = &paths[groups[b.group].members[b.start]];
                    pa.as_os_str().cmp(pb.as_os_str())
                });
                self.phase = Phase::Cluster;
                Ok(GroupingStep::Boundary)
            }
            Phase::Cluster => {
                let report = self.cluster();
                self.phase = Phase::Done;
                Ok(GroupingStep::Finished(report))
            }
            Phase::Done => Ok(GroupingStep::Finished(Report::default())),
        }
    }

    /// Run every remaining step and return the report.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`GroupingTask::step`].
    pub fn run(mut self) -> Result<Report, AnalysisError> {
        loop {
            if let GroupingStep::Finished(report) = self.step()? {
                return Ok(report);
            }
        }
    }

    fn index_chunk(&mut self) -> Result<GroupingStep, AnalysisError> {
        let end = (self.next + self.yield_interval).min(self.paths.len());
        for i in self.next..end {
            let size = self.sizes[i];
            match self.by_hash.get(&self.hashes[i]) {
                Some(&g) => {
                    let group = &mut self.groups[g];
                    if group.size != size {
                        return Err(AnalysisError::HashCollision {
                            hash: group.hash.clone(),
                            path: self.paths[i].clone(),
                            size,
                            other: self.paths[group.members[0]].clone(),
                            other_size: group.size,
                        });
                    }
                    group.members.push(i);
                }
                None => {
                    self.by_hash.insert(self.hashes[i].clone(), self.groups.len());
                    self.groups.push(HashGroup {
                        hash: self.hashes[i].clone(),
                        size,
                        members: vec![i],
                    });
                }
            }
        }
        self.next = end;
        if self.next >= self.paths.len() {
            self.phase = Phase::Rotate;
        }
        Ok(GroupingStep::Progress { file_count: end })
    }

    fn rotate(&mut self) {
        self.by_hash = HashMap::new();
        let paths = &self.paths;
        let ignored = &self.ignored;

        self.groups.retain(|group| group.members.len() > 1);
        for group in &mut self.groups {
            group
                .members
                .retain(|&i| !is_ignored(&paths[i], ignored));
        }
        self.groups.retain(|group| group.members.len() > 1);

        self.rotations = self
            .groups
            .iter()
            .enumerate()
            .flat_map(|(group, g)| (0..g.members.len()).map(move |start| Rotation { group, start }))
            .collect();
        log::debug!(
            "{} duplicate groups, {} rotations",
            self.groups.len(),
            self.rotations.len()
        );
    }

    fn cluster(&mut self) -> Report {
        let mut report = Report::default();
        let mut placed: HashSet<usize> = HashSet::with_capacity(self.groups.len());

        for rotation in std::mem::take(&mut self.rotations) {
            if !placed.insert(rotation.group) {
                continue;
            }
            let group = &self.groups[rotation.group];
            let (head, tail) = group.members.split_at(rotation.start);
            let ordered = tail.iter().chain(head).map(|&i| self.paths[i].as_path());

            let items = report.items_mut();
            let appended = items
                .last_mut()
                .is_some_and(|item| item.try_append(ordered.clone(), &group.hash, group.size));
            if !appended {
                items.push(DupItem::create(ordered, &group.hash, group.size));
            }
        }
        report
    }
}

fn is_ignored(path: &Path, ignored: &[PathBuf]) -> bool {
    ignored.iter().any(|prefix| path.starts_with(prefix))
}
