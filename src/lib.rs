//! `sweep` performs a regex find-and-replace over a directory tree.
//!
//! One pattern/replacement pair drives three kinds of change: file contents,
//! filenames and directory names. The main components are:
//!
//! - `patterns`: the compiled find pattern and replacement template.
//! - `filter`: exclusion patterns and filename suffix masks.
//! - `replacer`: line-by-line content rewriting through a temporary file.
//! - `file_renamer`: renaming a single entry within its parent directory.
//! - `traversal`: the work queue that ties the above together, renaming a
//!   directory before descending into it.
//! - `config`: loading and validating settings from YAML files and flags.
//!
//! Traversal is strictly sequential; the first filesystem error aborts the run.

pub mod cli;
pub mod config;
pub mod errors;
pub mod file_renamer;
pub mod filter;
pub mod output_formatter;
pub mod patterns;
pub mod replacer;
pub mod report;
pub mod traversal;

// Re-export main types for easier access by library users.
pub use errors::{Error, Result};
pub use output_formatter::{OutputFormat, OutputFormatter};
pub use patterns::{PatternMatcher, ReplacePolicy};
pub use report::RunReport;
pub use traversal::{TraversalConfig, run};
