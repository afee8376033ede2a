use crate::errors::{Error, Result};
use crate::patterns::{PatternMatcher, ReplacePolicy};
use crate::traversal::TraversalConfig;
use encoding_rs::Encoding;
use regex::Regex;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const FILE_CONTENTS: &str = "file-contents";
pub const FILENAMES: &str = "filenames";
pub const DIRECTORY_NAMES: &str = "directory-names";

/// Which parts of the tree a sweep touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplacementTypes {
    pub file_contents: bool,
    pub filenames: bool,
    pub directory_names: bool,
}

impl ReplacementTypes {
    pub fn all() -> Self {
        Self {
            file_contents: true,
            filenames: true,
            directory_names: true,
        }
    }

    /// Parses a comma-separated list of mode keywords.
    ///
    /// Valid values are `file-contents`, `filenames` and `directory-names`.
    pub fn parse(csv: &str) -> Result<Self> {
        let mut types = Self::default();

        for keyword in csv.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            match keyword {
                FILE_CONTENTS => types.file_contents = true,
                FILENAMES => types.filenames = true,
                DIRECTORY_NAMES => types.directory_names = true,
                other => {
                    return Err(Error::Config(format!(
                        "Invalid replacementType specified: {other}"
                    )));
                }
            }
            info!("Mode set to {keyword}");
        }

        Ok(types)
    }

    pub fn is_empty(&self) -> bool {
        !(self.file_contents || self.filenames || self.directory_names)
    }
}

/// Settings for a sweep, as read from a YAML file and/or the command line.
///
/// Example:
///
/// ```yaml
/// base-dir: src/main/resources
/// recursive: true
/// replacement-type: file-contents,filenames
/// find-regex: 'old[-_]name'
/// replace-value: new_name
/// file-mask: .xml,.properties
/// exclusions: '^target$'
/// encoding: windows-1252
/// replace-all: false
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SweepConfig {
    pub base_dir: Option<PathBuf>,
    pub recursive: bool,
    pub replacement_type: Option<String>,
    pub find_regex: Option<String>,
    pub replace_value: String,
    pub file_mask: Option<String>,
    pub exclusions: Option<String>,
    pub skip: bool,
    pub encoding: Option<String>,
    pub replace_all: bool,
    pub dry_run: bool,
    pub follow_links: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            recursive: false,
            replacement_type: None,
            find_regex: None,
            replace_value: String::new(),
            file_mask: None,
            exclusions: None,
            skip: false,
            encoding: None,
            replace_all: true,
            dry_run: false,
            follow_links: true,
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_dir: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub replacement_type: Option<String>,
    pub find_regex: Option<String>,
    pub replace_value: Option<String>,
    pub file_mask: Option<String>,
    pub exclusions: Option<String>,
    pub skip: Option<bool>,
    pub encoding: Option<String>,
    pub replace_all: Option<bool>,
    pub dry_run: Option<bool>,
    pub follow_links: Option<bool>,
}

/// A validated configuration ready to run.
#[derive(Debug)]
pub struct Prepared {
    pub base_dir: PathBuf,
    pub traversal: TraversalConfig,
    /// Non-fatal problems found while preparing, e.g. an unknown charset.
    pub warnings: Vec<String>,
}

impl SweepConfig {
    /// Applies command-line values on top of this configuration.
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if overrides.base_dir.is_some() {
            self.base_dir = overrides.base_dir;
        }
        if let Some(recursive) = overrides.recursive {
            self.recursive = recursive;
        }
        if overrides.replacement_type.is_some() {
            self.replacement_type = overrides.replacement_type;
        }
        if overrides.find_regex.is_some() {
            self.find_regex = overrides.find_regex;
        }
        if let Some(replace_value) = overrides.replace_value {
            self.replace_value = replace_value;
        }
        if overrides.file_mask.is_some() {
            self.file_mask = overrides.file_mask;
        }
        if overrides.exclusions.is_some() {
            self.exclusions = overrides.exclusions;
        }
        if let Some(skip) = overrides.skip {
            self.skip = skip;
        }
        if overrides.encoding.is_some() {
            self.encoding = overrides.encoding;
        }
        if let Some(replace_all) = overrides.replace_all {
            self.replace_all = replace_all;
        }
        if let Some(dry_run) = overrides.dry_run {
            self.dry_run = dry_run;
        }
        if let Some(follow_links) = overrides.follow_links {
            self.follow_links = follow_links;
        }
        self
    }

    /// Validates every setting and builds the traversal configuration.
    ///
    /// A relative `base-dir` is resolved against `working_dir`; no base dir
    /// means `working_dir` itself.
    pub fn prepare(&self, working_dir: &Path) -> Result<Prepared> {
        let modes = match self.replacement_type.as_deref() {
            Some(csv) => ReplacementTypes::parse(csv)?,
            None => return Err("replacement-type is required".into()),
        };
        if modes.is_empty() {
            return Err("replacement-type must name at least one mode".into());
        }

        let find_regex = self
            .find_regex
            .as_deref()
            .ok_or_else(|| Error::Config("find-regex is required".to_string()))?;
        let matcher = PatternMatcher::new(find_regex, self.replace_value.as_str())?;

        let masks = parse_file_masks(self.file_mask.as_deref());
        if !masks.is_empty() {
            info!("fileMasks set to: {masks:?}");
        }

        let mut exclusions = Vec::new();
        if let Some(pattern) = self.exclusions.as_deref().filter(|p| !p.is_empty()) {
            info!("Compiling regex for exclusions: {pattern}");
            exclusions.push(Regex::new(pattern)?);
        }

        let mut warnings = Vec::new();
        let (encoding, fallback) = resolve_encoding(self.encoding.as_deref());
        if let Some(message) = fallback {
            warn!("{message}");
            warnings.push(message);
        }

        let base_dir = ConfigLoader::resolve_base_dir(self.base_dir.as_deref(), working_dir)?;
        info!("baseDir set to: {}", base_dir.display());

        let traversal = TraversalConfig::new(matcher)
            .recursive(self.recursive)
            .policy(ReplacePolicy::from_replace_all(self.replace_all))
            .modes(modes)
            .masks(masks)
            .exclusions(exclusions)
            .encoding(encoding)
            .dry_run(self.dry_run)
            .follow_links(self.follow_links);

        Ok(Prepared {
            base_dir,
            traversal,
            warnings,
        })
    }
}

/// Splits a comma-separated suffix list, dropping empty items.
pub fn parse_file_masks(csv: Option<&str>) -> Vec<String> {
    csv.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Looks up a charset by label.
///
/// Unknown labels fall back to UTF-8; the second element then carries the
/// warning to show the user.
pub fn resolve_encoding(label: Option<&str>) -> (&'static Encoding, Option<String>) {
    let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
        return (encoding_rs::UTF_8, None);
    };

    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            info!("encoding set to: {}", encoding.name());
            (encoding, None)
        }
        None => (
            encoding_rs::UTF_8,
            Some(format!("Invalid encoding value {label}. Using default charset.")),
        ),
    }
}

/// A utility for locating and loading sweep configurations.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds the configuration file by searching in a prioritized list of locations.
    ///
    /// The search order is:
    /// 1. The path as given (absolute, or relative to the current directory).
    /// 2. A path relative to the `working_dir`.
    /// 3. Inside the `~/.sweep` directory.
    pub fn find_config(config_path: &Path, working_dir: &Path) -> Result<PathBuf> {
        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        let mut tried_locations = vec![config_path.display().to_string()];

        if config_path.is_relative() {
            let in_working_dir = working_dir.join(config_path);
            if in_working_dir.exists() {
                return Ok(in_working_dir);
            }
            tried_locations.push(in_working_dir.display().to_string());

            if let Some(home) = dirs::home_dir() {
                let home_config = home.join(".sweep").join(config_path);
                if home_config.exists() {
                    return Ok(home_config);
                }
                tried_locations.push(home_config.display().to_string());
            }
        }

        Err(format!(
            "Config file '{}' not found. Searched in:\n  - {}",
            config_path.display(),
            tried_locations.join("\n  - ")
        )
        .into())
    }

    /// Loads a `SweepConfig` from a YAML file.
    pub fn load(path: &Path) -> Result<SweepConfig> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Resolves and checks the base directory of a sweep.
    pub fn resolve_base_dir(base_dir: Option<&Path>, working_dir: &Path) -> Result<PathBuf> {
        let resolved = match base_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => working_dir.join(dir),
            None => working_dir.to_path_buf(),
        };

        if !resolved.is_dir() {
            return Err(Error::Config(format!(
                "Base directory {} does not exist or is not a directory",
                resolved.display()
            )));
        }

        Ok(resolved)
    }
}
