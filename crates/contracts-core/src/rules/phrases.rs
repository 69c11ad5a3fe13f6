//! Phrase proximity and ordering.

use serde_json::json;

use crate::types::Violation;

use super::text::lowercase_words;
use super::RuleContext;

/// Word indices where `term` starts.
///
/// A term of k words matches at i when text token i+j contains term word j.
fn term_positions(tokens: &[String], term: &str) -> Vec<usize> {
    let term_words = lowercase_words(term);
    if term_words.is_empty() || term_words.len() > tokens.len() {
        return Vec::new();
    }

    (0..=tokens.len() - term_words.len())
        .filter(|&i| {
            term_words
                .iter()
                .enumerate()
                .all(|(j, word)| tokens[i + j].contains(word.as_str()))
        })
        .collect()
}

pub(crate) fn proximity(
    identifier: &str,
    terms: &[String; 2],
    max_distance: usize,
    ctx: &RuleContext,
) -> Option<Violation> {
    let tokens = lowercase_words(ctx.text);
    let first = term_positions(&tokens, &terms[0]);
    let second = term_positions(&tokens, &terms[1]);

    let missing: Vec<&String> = terms
        .iter()
        .zip([&first, &second])
        .filter(|(_, positions)| positions.is_empty())
        .map(|(term, _)| term)
        .collect();

    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|t| t.as_str()).collect();
        return Some(Violation::rule(
            identifier,
            format!("Missing terms: {}", names.join(", ")),
            json!({ "terms": terms, "max_distance": max_distance, "missing": missing }),
        ));
    }

    let nearest = first
        .iter()
        .flat_map(|a| second.iter().map(move |b| a.abs_diff(*b)))
        .min()?;

    if nearest <= max_distance {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!(
            "Terms '{}' and '{}' must be within {} words of each other (nearest: {})",
            terms[0], terms[1], max_distance, nearest
        ),
        json!({ "terms": terms, "max_distance": max_distance, "nearest_distance": nearest }),
    ))
}

/// Case-insensitive first occurrence of `phrase`, as a character offset into `text`.
fn char_offset(text: &str, phrase: &str) -> Option<usize> {
    let mut haystack = String::with_capacity(text.len());
    // (byte offset in haystack, char index in text) for each lowered char
    let mut origins = Vec::with_capacity(text.len());
    for (index, c) in text.chars().enumerate() {
        for lower in c.to_lowercase() {
            origins.push((haystack.len(), index));
            haystack.push(lower);
        }
    }

    let byte = haystack.find(&phrase.to_lowercase())?;
    let slot = origins.partition_point(|&(start, _)| start <= byte);
    Some(slot.checked_sub(1).map_or(0, |i| origins[i].1))
}

/// First occurrence of `first` must not come after the first occurrence of `then`.
pub(crate) fn order(identifier: &str, first: &str, then: &str, ctx: &RuleContext) -> Option<Violation> {
    let first_offset = char_offset(ctx.text, first);
    let then_offset = char_offset(ctx.text, then);

    let message = match (first_offset, then_offset) {
        (Some(a), Some(b)) if a <= b => return None,
        (None, _) => format!("Missing required phrase: '{}'", first),
        (_, None) => format!("Missing required phrase: '{}'", then),
        _ => format!("Phrase '{}' must appear before '{}'", first, then),
    };

    Some(Violation::rule(
        identifier,
        message,
        json!({
            "first": first,
            "then": then,
            "first_offset": first_offset,
            "then_offset": then_offset,
        }),
    ))
}
