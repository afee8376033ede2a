use crate::errors::{Error, FsAction, Result};
use crate::patterns::{PatternMatcher, ReplacePolicy};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened when an entry was offered to the [`Renamer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The computed name equals the current one; nothing was touched.
    Unchanged,
    /// The entry was renamed (or would have been, on a dry run).
    Renamed { from: PathBuf, to: PathBuf },
    /// The name is not valid UTF-8 and cannot be matched; it was left alone.
    Skipped,
}

impl RenameOutcome {
    /// The path under which the entry can be found after this outcome.
    ///
    /// On a dry run nothing moves, so callers pass `dry_run` to get the old path back.
    pub fn resolve(&self, original: &Path, dry_run: bool) -> PathBuf {
        match self {
            RenameOutcome::Renamed { to, .. } if !dry_run => to.clone(),
            _ => original.to_path_buf(),
        }
    }
}

/// Renames files and directories within their parent directory.
pub struct Renamer<'a> {
    matcher: &'a PatternMatcher,
    policy: ReplacePolicy,
    dry_run: bool,
}

impl<'a> Renamer<'a> {
    pub fn new(matcher: &'a PatternMatcher, policy: ReplacePolicy, dry_run: bool) -> Self {
        Self {
            matcher,
            policy,
            dry_run,
        }
    }

    /// Computes the new name for an entry based on the renaming rule.
    ///
    /// Returns `None` when the name is not valid UTF-8.
    pub fn new_name(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        Some(self.matcher.replace(name, self.policy).into_owned())
    }

    /// Renames a single file or directory if the rule changes its name.
    ///
    /// Refuses to replace an existing entry under the new name.
    pub fn rename(&self, path: &Path) -> Result<RenameOutcome> {
        let Some(new_name) = self.new_name(path) else {
            warn!("Skipping {}: name is not valid UTF-8", path.display());
            return Ok(RenameOutcome::Skipped);
        };

        if path.file_name().is_some_and(|old| old == new_name.as_str()) {
            return Ok(RenameOutcome::Unchanged);
        }

        if !is_plain_name(&new_name) {
            return Err(Error::fs(
                FsAction::Rename,
                path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("replacement produced an invalid name: {new_name:?}"),
                ),
            ));
        }

        let new_path = path.with_file_name(&new_name);
        if target_taken(path, &new_path) {
            return Err(Error::fs(
                FsAction::Rename,
                path,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", new_path.display()),
                ),
            ));
        }

        if self.dry_run {
            info!("Would rename {} to {}", display_name(path), display_name(&new_path));
        } else {
            info!("Renaming {} to {}", display_name(path), display_name(&new_path));
            fs::rename(path, &new_path).map_err(|e| Error::fs(FsAction::Rename, path, e))?;
        }

        Ok(RenameOutcome::Renamed {
            from: path.to_path_buf(),
            to: new_path,
        })
    }
}

/// `true` if `target` names an existing entry other than `source` itself.
///
/// A case-only rename on a case-insensitive filesystem sees `target` as
/// existing; it is the same entry when both names lead to one file.
fn target_taken(source: &Path, target: &Path) -> bool {
    let Ok(target_meta) = fs::symlink_metadata(target) else {
        return false;
    };
    match fs::symlink_metadata(source) {
        Ok(source_meta) => !same_entry(source, &source_meta, target, &target_meta),
        Err(_) => true,
    }
}

#[cfg(unix)]
fn same_entry(_source: &Path, source: &fs::Metadata, _target: &Path, target: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    source.dev() == target.dev() && source.ino() == target.ino()
}

// Without inode numbers, fall back to the names: only a case-insensitive
// filesystem resolves a case variant to the entry being renamed.
#[cfg(not(unix))]
fn same_entry(source: &Path, _source: &fs::Metadata, target: &Path, _target: &fs::Metadata) -> bool {
    match (source.file_name(), target.file_name()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// The rename must stay within the same parent: a non-empty single component.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rename_replace_all() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a-b-c.txt");
        fs::write(&file, "").unwrap();

        let matcher = PatternMatcher::new("-", "_").unwrap();
        let outcome = Renamer::new(&matcher, ReplacePolicy::All, false).rename(&file).unwrap();

        let expected = temp_dir.path().join("a_b_c.txt");
        assert_eq!(
            outcome,
            RenameOutcome::Renamed {
                from: file.clone(),
                to: expected.clone()
            }
        );
        assert!(expected.exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_rename_replace_first() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a-b-c.txt");
        fs::write(&file, "").unwrap();

        let matcher = PatternMatcher::new("-", "_").unwrap();
        Renamer::new(&matcher, ReplacePolicy::First, false).rename(&file).unwrap();

        assert!(temp_dir.path().join("a_b-c.txt").exists());
    }

    #[test]
    fn test_unchanged_name_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "").unwrap();

        let matcher = PatternMatcher::new("-", "_").unwrap();
        let renamer = Renamer::new(&matcher, ReplacePolicy::All, false);
        let outcome = renamer.rename(&file).unwrap();

        assert_eq!(outcome, RenameOutcome::Unchanged);
        assert_eq!(outcome.resolve(&file, false), file);
    }

    #[test]
    fn test_existing_target_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a-b");
        let taken = temp_dir.path().join("a_b");
        fs::write(&file, "source").unwrap();
        fs::write(&taken, "existing").unwrap();

        let matcher = PatternMatcher::new("-", "_").unwrap();
        let err = Renamer::new(&matcher, ReplacePolicy::All, false)
            .rename(&file)
            .unwrap_err();

        assert_eq!(err.path(), Some(file.as_path()));
        assert_eq!(fs::read_to_string(&taken).unwrap(), "existing");
        assert!(file.exists());
    }

    #[test]
    fn test_case_variant_of_distinct_file_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("x.txt");
        let other = temp_dir.path().join("X.txt");
        fs::write(&file, "source").unwrap();
        fs::write(&other, "precious").unwrap();
        if fs::read_dir(temp_dir.path()).unwrap().count() != 2 {
            // Case-insensitive filesystem: both names are one file.
            return;
        }

        let matcher = PatternMatcher::new("^x", "X").unwrap();
        let err = Renamer::new(&matcher, ReplacePolicy::All, false)
            .rename(&file)
            .unwrap_err();

        assert_eq!(err.path(), Some(file.as_path()));
        assert_eq!(fs::read_to_string(&other).unwrap(), "precious");
        assert_eq!(fs::read_to_string(&file).unwrap(), "source");
    }

    #[test]
    fn test_case_only_rename_is_allowed() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("readme.md");
        fs::write(&file, "").unwrap();

        let matcher = PatternMatcher::new("readme", "README").unwrap();
        Renamer::new(&matcher, ReplacePolicy::All, false).rename(&file).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["README.md"]);
    }

    #[test]
    fn test_dry_run_keeps_old_path() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("some-dir");
        fs::create_dir(&dir).unwrap();

        let matcher = PatternMatcher::new("-", "_").unwrap();
        let outcome = Renamer::new(&matcher, ReplacePolicy::All, true).rename(&dir).unwrap();

        assert!(matches!(outcome, RenameOutcome::Renamed { .. }));
        assert_eq!(outcome.resolve(&dir, true), dir);
        assert!(dir.exists());
    }

    #[test]
    fn test_replacement_cannot_escape_parent() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a-b");
        fs::write(&file, "").unwrap();

        let matcher = PatternMatcher::new("-", "/").unwrap();
        assert!(Renamer::new(&matcher, ReplacePolicy::All, false).rename(&file).is_err());
        assert!(file.exists());
    }

    #[test]
    fn test_capture_groups_in_names() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("test_widget.rs");
        fs::write(&file, "").unwrap();

        let matcher = PatternMatcher::new(r"test_(.*)", "spec_$1").unwrap();
        Renamer::new(&matcher, ReplacePolicy::All, false).rename(&file).unwrap();

        assert!(temp_dir.path().join("spec_widget.rs").exists());
    }
}
