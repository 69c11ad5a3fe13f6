//! Text segmentation shared by the rule evaluators.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]+").unwrap();

    // Ordered list item: "1." at the start of a trimmed line
    pub(crate) static ref NUMBERED_ITEM: Regex = Regex::new(r"^\d+\.").unwrap();

    // ATX heading, up to three spaces of indentation
    static ref ATX_HEADING: Regex = Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]|$)").unwrap();
}

/// Sentences: maximal runs between `.`, `!` and `?`, trimmed, empties dropped.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Number of whitespace-delimited tokens.
pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased whitespace tokens.
pub(crate) fn lowercase_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Heading depth of a Markdown line, if it is an ATX heading.
pub(crate) fn heading_depth(line: &str) -> Option<usize> {
    ATX_HEADING.captures(line).map(|caps| caps[1].len())
}
