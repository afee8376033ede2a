//! The traversal engine.
//!
//! Entries are pulled one at a time from a [`WorkQueue`] seeded with the base
//! directory's children. A directory is renamed first and only then listed, so
//! its children are always discovered under the directory's current name. The
//! children go to the front of the queue: a subtree is finished before the
//! directory's remaining siblings are visited.

use crate::config::ReplacementTypes;
use crate::errors::{Error, Result};
use crate::file_renamer::{RenameOutcome, Renamer};
use crate::filter::EntryFilter;
use crate::patterns::{PatternMatcher, ReplacePolicy};
use crate::replacer::ContentRewriter;
use crate::report::{Change, ChangeKind, RunReport};
use encoding_rs::Encoding;
use regex::Regex;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Immutable settings for one traversal run.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    matcher: PatternMatcher,
    filter: EntryFilter,
    policy: ReplacePolicy,
    modes: ReplacementTypes,
    recursive: bool,
    encoding: &'static Encoding,
    dry_run: bool,
    follow_links: bool,
}

impl TraversalConfig {
    /// Starts from replace-all, non-recursive, UTF-8, no filters, every mode
    /// enabled and symbolic links followed.
    pub fn new(matcher: PatternMatcher) -> Self {
        Self {
            matcher,
            filter: EntryFilter::default(),
            policy: ReplacePolicy::All,
            modes: ReplacementTypes::all(),
            recursive: false,
            encoding: encoding_rs::UTF_8,
            dry_run: false,
            follow_links: true,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn policy(mut self, policy: ReplacePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn modes(mut self, modes: ReplacementTypes) -> Self {
        self.modes = modes;
        self
    }

    /// Literal filename suffixes; an empty list allows every file.
    pub fn masks(mut self, masks: Vec<String>) -> Self {
        self.filter = EntryFilter::new(masks, self.filter.exclusions().to_vec());
        self
    }

    pub fn exclusions(mut self, exclusions: Vec<Regex>) -> Self {
        self.filter = EntryFilter::new(self.filter.masks().to_vec(), exclusions);
        self
    }

    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }
}

/// How the engine treats an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Sockets, devices, symlinks that are not followed or lead nowhere.
    Other,
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// A path discovered during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// The bare entry name, lossily decoded for matching.
    pub fn name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or(Cow::Borrowed(""))
    }
}

/// Pending entries, visited front to back.
#[derive(Debug, Default)]
pub struct WorkQueue {
    entries: VecDeque<Entry>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop_front(&mut self) -> Option<Entry> {
        self.entries.pop_front()
    }

    /// Queues `children` ahead of everything already pending, in the given order.
    pub fn push_children_front(&mut self, children: Vec<Entry>) {
        for child in children.into_iter().rev() {
            self.entries.push_front(child);
        }
    }
}

/// Lists the direct children of `dir`, sorted by name.
///
/// When links are followed, a dangling link or one leading back to `dir` is
/// listed as [`EntryKind::Other`] rather than failing the listing.
pub fn list_children(dir: &Path, follow_links: bool) -> Result<Vec<Entry>> {
    let mut children = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(follow_links)
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let kind = EntryKind::from(entry.file_type());
                children.push(Entry::new(entry.into_path(), kind));
            }
            Err(err) => match unresolvable_link(&err) {
                Some(path) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    children.push(Entry::new(path, EntryKind::Other));
                }
                None => return Err(err.into()),
            },
        }
    }

    Ok(children)
}

/// The path of a symlink that could not be followed, if that caused `err`.
fn unresolvable_link(err: &walkdir::Error) -> Option<PathBuf> {
    let path = err.path()?;
    let is_link = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    (is_link && (err.loop_ancestor().is_some() || fs::metadata(path).is_err())).then(|| path.to_path_buf())
}

/// Runs a sweep over the children of `base_dir`.
///
/// The base directory's own name is never a rename candidate. The first
/// filesystem failure aborts the run; changes made before it are kept.
pub fn run(base_dir: &Path, config: &TraversalConfig) -> Result<RunReport> {
    if !base_dir.is_dir() {
        return Err(Error::Config(format!(
            "Base directory {} does not exist or is not a directory",
            base_dir.display()
        )));
    }

    let mut sweeper = Sweeper::new(config);
    let mut queue = WorkQueue::new();
    queue.push_children_front(list_children(base_dir, config.follow_links)?);

    while let Some(entry) = queue.pop_front() {
        sweeper.report.entries_visited += 1;
        match entry.kind {
            EntryKind::Directory => {
                if let Some(children) = sweeper.process_directory(entry)? {
                    queue.push_children_front(children);
                }
            }
            EntryKind::File => sweeper.process_file(entry)?,
            EntryKind::Other => {
                debug!("Skipping {}: not a regular file or directory", entry.path.display());
                sweeper.report.skipped += 1;
            }
        }
    }

    Ok(sweeper.report)
}

struct Sweeper<'a> {
    config: &'a TraversalConfig,
    renamer: Renamer<'a>,
    rewriter: ContentRewriter<'a>,
    report: RunReport,
}

impl<'a> Sweeper<'a> {
    fn new(config: &'a TraversalConfig) -> Self {
        Self {
            config,
            renamer: Renamer::new(&config.matcher, config.policy, config.dry_run),
            rewriter: ContentRewriter::new(&config.matcher, config.policy, config.encoding, config.dry_run),
            report: RunReport::new(config.dry_run),
        }
    }

    /// Renames the directory if requested, then lists it under its current path.
    fn process_directory(&mut self, entry: Entry) -> Result<Option<Vec<Entry>>> {
        let mut path = entry.path.clone();

        if self.config.modes.directory_names {
            if self.config.filter.should_exclude(&entry.name()) {
                debug!("Excluded directory {}", path.display());
                self.report.excluded += 1;
            } else {
                let outcome = self.renamer.rename(&path)?;
                path = self.record_rename(ChangeKind::Directory, &path, outcome);
            }
        }

        if !self.config.recursive {
            return Ok(None);
        }

        let children = list_children(&path, self.config.follow_links)?;
        debug!("Queued {} entries from {}", children.len(), path.display());
        Ok(Some(children))
    }

    /// Rewrites contents first, on the pre-rename path, then renames.
    fn process_file(&mut self, entry: Entry) -> Result<()> {
        let name = entry.name();
        let path = entry.path.as_path();

        if self.config.filter.should_exclude(&name) {
            debug!("Excluded file {}", path.display());
            self.report.excluded += 1;
            return Ok(());
        }

        if !self.config.filter.should_process(&name) {
            debug!("Masked out {}", path.display());
            self.report.masked_out += 1;
            return Ok(());
        }

        if self.config.modes.file_contents {
            let outcome = self.rewriter.rewrite(path)?;
            self.report.files_scanned += 1;
            if outcome.lossy {
                self.report.warnings.push(format!(
                    "{} contained characters not representable in {}",
                    path.display(),
                    self.config.encoding.name()
                ));
            }
            if outcome.substitutions > 0 {
                info!("Modified {} ({} changes)", path.display(), outcome.substitutions);
                self.report.record(Change {
                    kind: ChangeKind::Contents,
                    from: path.to_path_buf(),
                    to: path.to_path_buf(),
                    substitutions: outcome.substitutions,
                });
            }
        }

        if self.config.modes.filenames {
            let outcome = self.renamer.rename(path)?;
            self.record_rename(ChangeKind::File, path, outcome);
        }

        Ok(())
    }

    /// Logs a rename outcome and returns the path the entry now lives at.
    fn record_rename(&mut self, kind: ChangeKind, path: &Path, outcome: RenameOutcome) -> PathBuf {
        let current = outcome.resolve(path, self.config.dry_run);
        match outcome {
            RenameOutcome::Renamed { from, to } => self.report.record(Change {
                kind,
                from,
                to,
                substitutions: 0,
            }),
            RenameOutcome::Skipped => self.report.skipped += 1,
            RenameOutcome::Unchanged => {}
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry(name: &str) -> Entry {
        Entry::new(name, EntryKind::File)
    }

    #[test]
    fn test_children_visited_before_pending_siblings() {
        let mut queue = WorkQueue::new();
        queue.push_children_front(vec![entry("a"), entry("b"), entry("c")]);

        assert_eq!(queue.pop_front().unwrap().path, PathBuf::from("a"));
        queue.push_children_front(vec![entry("a/1"), entry("a/2")]);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_front())
            .map(|e| e.path)
            .collect();
        assert_eq!(
            order,
            ["a/1", "a/2", "b", "c"].map(PathBuf::from).to_vec()
        );
    }

    #[test]
    fn test_list_children_sorted_and_classified() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("b-dir")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "").unwrap();
        fs::write(temp_dir.path().join("c.txt"), "").unwrap();
        fs::write(temp_dir.path().join("b-dir").join("nested.txt"), "").unwrap();

        let children = list_children(temp_dir.path(), false).unwrap();

        let names: Vec<_> = children.iter().map(|e| e.name().into_owned()).collect();
        assert_eq!(names, ["a.txt", "b-dir", "c.txt"]);
        assert_eq!(children[1].kind, EntryKind::Directory);
        assert_eq!(children[0].kind, EntryKind::File);
    }

    #[test]
    fn test_missing_base_dir_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = TraversalConfig::new(PatternMatcher::new("-", "_").unwrap());

        let err = run(&temp_dir.path().join("nope"), &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_base_dir_name_never_renamed() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("base-dir");
        fs::create_dir(&base).unwrap();

        let config = TraversalConfig::new(PatternMatcher::new("-", "_").unwrap()).recursive(true);
        let report = run(&base, &config).unwrap();

        assert!(base.exists());
        assert_eq!(report.entries_visited, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_followed_unless_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real-file.txt");
        fs::write(&target, "a-b\n").unwrap();
        let base = temp_dir.path().join("base");
        fs::create_dir(&base).unwrap();
        std::os::unix::fs::symlink(&target, base.join("link.txt")).unwrap();

        let matcher = PatternMatcher::new("-", "_").unwrap();
        let modes = ReplacementTypes {
            file_contents: true,
            filenames: false,
            directory_names: false,
        };

        let config = TraversalConfig::new(matcher.clone()).modes(modes).follow_links(false);
        let report = run(&base, &config).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "a-b\n");

        let config = TraversalConfig::new(matcher).modes(modes);
        let report = run(&base, &config).unwrap();
        assert_eq!(report.files_rewritten, 1);
        assert_eq!(fs::read_to_string(base.join("link.txt")).unwrap(), "a_b\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_and_looping_links_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("base");
        fs::create_dir(&base).unwrap();
        fs::write(base.join("a-file.txt"), "").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("missing"), base.join("dangling-link")).unwrap();
        std::os::unix::fs::symlink(&base, base.join("self-link")).unwrap();

        let config = TraversalConfig::new(PatternMatcher::new("-", "_").unwrap()).recursive(true);
        let report = run(&base, &config).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.files_renamed, 1);
        assert!(base.join("a_file.txt").exists());
        assert!(fs::symlink_metadata(base.join("dangling-link")).is_ok());
    }
}
