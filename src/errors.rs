use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The filesystem operation that was being attempted when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAction {
    /// Listing the children of a directory.
    List,
    /// Renaming a file or directory.
    Rename,
    /// Creating the temporary file used for content rewriting.
    CreateTemp,
    /// Reading a file's contents.
    Read,
    /// Writing to the temporary file.
    Write,
    /// Deleting the original file before a fallback swap.
    Remove,
    /// Reading metadata.
    Inspect,
}

impl fmt::Display for FsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            FsAction::List => "list",
            FsAction::Rename => "rename",
            FsAction::CreateTemp => "create temporary file for",
            FsAction::Read => "read",
            FsAction::Write => "write",
            FsAction::Remove => "remove",
            FsAction::Inspect => "inspect",
        };
        f.write_str(verb)
    }
}

/// The primary error type for all operations in `sweep`.
///
/// Configuration problems are reported before any file is touched. Filesystem
/// problems abort the traversal at the first failure and carry the offending path.
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error outside of the traversal itself (config files, report output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error that occurred during regex compilation.
    #[error("Pattern compilation failed: {0}")]
    Regex(#[from] regex::Error),

    /// An error that occurred while parsing a YAML configuration file.
    #[error("Config parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A general configuration-related error.
    #[error("Config error: {0}")]
    Config(String),

    /// A filesystem operation failed during traversal.
    #[error("Failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: FsAction,
        path: PathBuf,
        source: std::io::Error,
    },

    /// The original file was removed but the rewritten copy could not be moved
    /// into its place. The rewritten content is left at `orphan`.
    #[error(
        "Failed to move rewritten content into {}, it was kept at {}: {source}",
        path.display(),
        orphan.display()
    )]
    SwapFailed {
        path: PathBuf,
        orphan: PathBuf,
        source: std::io::Error,
    },

    /// An error related to JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error related to CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A convenient type alias for `Result<T, sweep::errors::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps an I/O error raised while performing `action` on `path`.
    pub fn fs(action: FsAction, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Filesystem {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Filesystem { path, .. } | Error::SwapFailed { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        Error::Filesystem {
            action: FsAction::List,
            path,
            source: err.into(),
        }
    }
}
