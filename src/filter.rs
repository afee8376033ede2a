use regex::Regex;

/// Decides which entries take part in a sweep.
///
/// Exclusions apply to files and directories alike and match anywhere in the
/// bare entry name. Masks are literal suffixes and only ever restrict files.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    masks: Vec<String>,
    exclusions: Vec<Regex>,
}

impl EntryFilter {
    pub fn new(masks: Vec<String>, exclusions: Vec<Regex>) -> Self {
        Self { masks, exclusions }
    }

    /// `true` if any exclusion pattern matches somewhere in `name`.
    pub fn should_exclude(&self, name: &str) -> bool {
        self.exclusions.iter().any(|re| re.is_match(name))
    }

    /// `true` if no masks are configured or `name` ends with one of them.
    pub fn should_process(&self, name: &str) -> bool {
        self.masks.is_empty() || self.masks.iter().any(|mask| name.ends_with(mask.as_str()))
    }

    pub fn masks(&self) -> &[String] {
        &self.masks
    }

    pub fn exclusions(&self) -> &[Regex] {
        &self.exclusions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(masks: &[&str], exclusions: &[&str]) -> EntryFilter {
        EntryFilter::new(
            masks.iter().map(|m| m.to_string()).collect(),
            exclusions.iter().map(|e| Regex::new(e).unwrap()).collect(),
        )
    }

    #[test]
    fn test_empty_filter_allows_everything() {
        let f = EntryFilter::default();
        assert!(!f.should_exclude("anything"));
        assert!(f.should_process("anything.bin"));
    }

    #[test]
    fn test_exclusion_is_unanchored() {
        let f = filter(&[], &["top-"]);
        assert!(f.should_exclude("test-top-directory"));
        assert!(!f.should_exclude("test-sub-directory"));
    }

    #[test]
    fn test_any_exclusion_matches() {
        let f = filter(&[], &["^build$", r"\.lock$"]);
        assert!(f.should_exclude("build"));
        assert!(f.should_exclude("Cargo.lock"));
        assert!(!f.should_exclude("builder"));
    }

    #[test]
    fn test_mask_is_literal_suffix() {
        let f = filter(&[".xml", ".txt"], &[]);
        assert!(f.should_process("pom.xml"));
        assert!(f.should_process("notes.txt"));
        assert!(!f.should_process("some_file_name"));
        // A literal "." in the mask, not a regex wildcard.
        assert!(!f.should_process("fooaxml"));
        assert!(!f.should_process("pom.xml.bak"));
    }
}
