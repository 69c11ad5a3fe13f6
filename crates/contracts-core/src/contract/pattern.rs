//! Compiled regex patterns carried by contracts.

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

/// A regex compiled at contract-load time.
///
/// Keeps the source text so violations and reports can quote the pattern
/// exactly as the contract author wrote it.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Compile a case-sensitive pattern (structural `pattern` constraints).
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Self::build(source, false)
    }

    /// Compile a case-insensitive pattern (content rules).
    pub fn case_insensitive(source: &str) -> Result<Self, regex::Error> {
        Self::build(source, true)
    }

    fn build(source: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self {
            source: source.to_string(),
            case_insensitive,
            regex,
        })
    }

    /// The pattern as written in the contract.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Search semantics: true if the pattern matches anywhere.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// True if a match starts at byte offset 0.
    ///
    /// `find` returns the leftmost match, so a match at 0 exists iff the
    /// first match starts there.
    pub fn matches_at_start(&self, text: &str) -> bool {
        self.regex.find(text).is_some_and(|m| m.start() == 0)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
