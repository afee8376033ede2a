use crate::config::Overrides;
use clap::Parser;
use std::path::PathBuf;

/// Regex find-and-replace across a directory tree.
///
/// `sweep` rewrites file contents, renames files and renames directories using
/// one find pattern and one replacement, optionally recursing into
/// subdirectories. Children of a renamed directory are found under its new name.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Regex find-and-replace over file contents, filenames and directory names",
    long_about = "sweep - find a regex in file contents, filenames and directory names and replace it.

QUICK EXAMPLES:
  sweep -t filenames -f '-' -r '_' .                          # a-b.txt -> a_b.txt
  sweep -t file-contents,filenames -f 'old' -r 'new' -R src    # Whole subtree
  sweep -t directory-names -f 'test_(.*)' -r 'spec_$1' -R .    # Capture groups
  sweep -t file-contents -f 'TODO' -r 'DONE' --first -m .md .  # First match per file
  sweep -c sweep.yaml --dry-run                                # Preview from a config file"
)]
pub struct Args {
    /// The base directory. Its own name is never changed. Defaults to the current directory.
    pub base_dir: Option<PathBuf>,

    /// Path to a YAML configuration file. Command-line values override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// What to replace: a comma-separated list of file-contents, filenames, directory-names.
    #[arg(short = 't', long = "replacement-type")]
    pub replacement_type: Option<String>,

    /// The regex to find.
    #[arg(short = 'f', long = "find")]
    pub find_regex: Option<String>,

    /// The replacement. Capture groups are available as $1, ${1}, $name, ${name}; `$$` is a literal `$`.
    #[arg(short = 'r', long = "replace")]
    pub replace_value: Option<String>,

    /// Descend into subdirectories.
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Replace only the first match (per name, or per file for contents).
    #[arg(long)]
    pub first: bool,

    /// Comma-separated filename suffixes to restrict files to (e.g. `.xml,.properties`).
    #[arg(short = 'm', long = "file-mask")]
    pub file_mask: Option<String>,

    /// Regex; files and directories whose name matches are left alone.
    #[arg(short = 'e', long)]
    pub exclusions: Option<String>,

    /// Charset used to read and write file contents (default UTF-8).
    #[arg(long, env = "SWEEP_ENCODING")]
    pub encoding: Option<String>,

    /// Preview the changes without touching any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave symbolic links alone instead of treating them as the entries they point to.
    #[arg(long)]
    pub no_follow_links: bool,

    /// Do nothing.
    #[arg(long, env = "SWEEP_SKIP")]
    pub skip: bool,

    /// The output format for the report (`text`, `json`, `csv`).
    #[arg(short = 'o', long = "format", default_value = "text")]
    pub format: String,

    /// Log every skipped and queued entry.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// The command-line values that override a configuration file.
    ///
    /// Boolean switches can only turn a setting on.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_dir: self.base_dir.clone(),
            recursive: self.recursive.then_some(true),
            replacement_type: self.replacement_type.clone(),
            find_regex: self.find_regex.clone(),
            replace_value: self.replace_value.clone(),
            file_mask: self.file_mask.clone(),
            exclusions: self.exclusions.clone(),
            skip: self.skip.then_some(true),
            encoding: self.encoding.clone(),
            replace_all: self.first.then_some(false),
            dry_run: self.dry_run.then_some(true),
            follow_links: self.no_follow_links.then_some(false),
        }
    }
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_overrides() {
        let args = Args::try_parse_from([
            "sweep", "-t", "filenames", "--find=-", "-r", "_", "-R", "--first", "some/dir",
        ])
        .unwrap();
        let overrides = args.overrides();

        assert_eq!(overrides.base_dir, Some(PathBuf::from("some/dir")));
        assert_eq!(overrides.recursive, Some(true));
        assert_eq!(overrides.replace_all, Some(false));
        assert_eq!(overrides.find_regex.as_deref(), Some("-"));
        assert_eq!(overrides.dry_run, None);
        assert_eq!(overrides.follow_links, None);
    }

    #[test]
    fn test_no_follow_links_turns_following_off() {
        let args = Args::try_parse_from(["sweep", "--no-follow-links"]).unwrap();
        assert_eq!(args.overrides().follow_links, Some(false));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["sweep", "-v", "-q"]).is_err());
    }
}
