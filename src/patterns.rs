use crate::errors::Result;
use regex::Regex;
use std::borrow::Cow;

/// Which occurrences of the find pattern get substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Every non-overlapping match.
    All,
    /// Only the left-most match. For content rewriting the scope is the whole
    /// file, for renames it is the single name.
    First,
}

impl ReplacePolicy {
    /// Maps the `replace-all` flag onto a policy.
    pub fn from_replace_all(replace_all: bool) -> Self {
        if replace_all {
            ReplacePolicy::All
        } else {
            ReplacePolicy::First
        }
    }
}

/// A compiled find pattern paired with its replacement template.
///
/// `$1`, `${1}`, `$name` and `${name}` refer to capture groups and `$$` is a
/// literal dollar. A numbered reference ends at its last digit, so `$1_x` is
/// group 1 followed by `_x`.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
    replacement: String,
}

impl PatternMatcher {
    /// Compiles `pattern` and pairs it with `replacement`.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        Ok(Self::from_regex(Regex::new(pattern)?, replacement))
    }

    /// Wraps an already compiled regex.
    pub fn from_regex(regex: Regex, replacement: impl Into<String>) -> Self {
        Self {
            regex,
            replacement: brace_group_numbers(&replacement.into()),
        }
    }

    /// Returns `true` if the pattern matches anywhere in `input`.
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// Substitutes every non-overlapping match, scanning the original input
    /// left to right. Borrows `input` when nothing matched.
    pub fn replace_all<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.regex.replace_all(input, self.replacement.as_str())
    }

    /// Substitutes only the left-most match.
    pub fn replace_first<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.regex.replace(input, self.replacement.as_str())
    }

    /// Applies `policy` to a single string.
    pub fn replace<'a>(&self, input: &'a str, policy: ReplacePolicy) -> Cow<'a, str> {
        match policy {
            ReplacePolicy::All => self.replace_all(input),
            ReplacePolicy::First => self.replace_first(input),
        }
    }

    /// Number of non-overlapping matches in `input`.
    pub fn count_matches(&self, input: &str) -> usize {
        self.regex.find_iter(input).count()
    }
}

/// Rewrites `$N` to `${N}` where a name character follows the digits.
///
/// The `regex` crate reads `$1_x` as the group named `1_x`.
fn brace_group_numbers(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        if c != '$' {
            continue;
        }
        match chars.peek() {
            Some('$') => {
                out.push('$');
                chars.next();
            }
            Some(d) if d.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                if chars.peek().is_some_and(|n| n.is_alphanumeric() || *n == '_') {
                    out.push_str(&format!("{{{digits}}}"));
                } else {
                    out.push_str(&digits);
                }
            }
            _ => {}
        }
    }

    out
}
