use serde::Serialize;
use std::path::PathBuf;

/// What a recorded change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A directory was renamed.
    Directory,
    /// A file was renamed.
    File,
    /// A file's contents were rewritten.
    Contents,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Directory => "directory",
            ChangeKind::File => "file",
            ChangeKind::Contents => "contents",
        }
    }
}

/// A single mutation made (or planned, on a dry run) by a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub from: PathBuf,
    /// Equal to `from` for content rewrites.
    pub to: PathBuf,
    /// Number of substitutions; `0` for renames.
    pub substitutions: usize,
}

/// Statistics and change log of one traversal run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    /// Entries popped off the work queue.
    pub entries_visited: usize,
    pub directories_renamed: usize,
    pub files_renamed: usize,
    /// Files whose contents were streamed through the matcher.
    pub files_scanned: usize,
    /// Files with at least one substitution.
    pub files_rewritten: usize,
    pub excluded: usize,
    pub masked_out: usize,
    /// Entries left alone because they were special files or had non-UTF-8 names.
    pub skipped: usize,
    pub changes: Vec<Change>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Total substitutions across all rewritten files.
    pub fn total_substitutions(&self) -> usize {
        self.changes.iter().map(|c| c.substitutions).sum()
    }

    /// `true` if the run changed (or would change) anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub(crate) fn record(&mut self, change: Change) {
        match change.kind {
            ChangeKind::Directory => self.directories_renamed += 1,
            ChangeKind::File => self.files_renamed += 1,
            ChangeKind::Contents => self.files_rewritten += 1,
        }
        self.changes.push(change);
    }
}
