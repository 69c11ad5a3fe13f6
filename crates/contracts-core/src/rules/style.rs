//! Stylistic heuristics: passive voice, repeated sentences, heading depth.
//!
//! Word-level heuristics only: passive detection looks at a "to be"
//! auxiliary and the word that follows it, nothing more.

use lazy_static::lazy_static;
use serde_json::json;
use std::collections::{HashMap, HashSet};

use crate::types::Violation;

use super::text::{heading_depth, sentences};
use super::RuleContext;

lazy_static! {
    static ref TO_BE: HashSet<&'static str> = [
        "am", "is", "are", "was", "were", "be", "been", "being",
    ]
    .into_iter()
    .collect();

    static ref IRREGULAR_PARTICIPLES: HashSet<&'static str> = [
        "made", "built", "done", "given", "taken", "written", "sold", "known",
        "seen", "found", "told", "held", "kept", "paid", "sent", "shown",
        "brought", "bought", "thought", "led", "left", "put", "set", "cut",
        "read", "run", "won", "lost", "met", "hit", "hurt", "shut", "spent",
        "taught", "caught", "fed", "felt", "heard", "laid", "meant", "said",
        "sought", "struck", "understood", "chosen", "driven", "eaten",
        "forgotten", "frozen", "hidden", "spoken", "stolen", "broken",
        "worn", "torn", "born", "drawn", "grown", "thrown", "flown",
        "begun", "sung", "rung", "drunk", "sunk", "swum", "hung", "dug",
        "stuck", "spun", "ground", "bound", "wound",
    ]
    .into_iter()
    .collect();

    // -ed/-en words that are not participles
    static ref NOT_PARTICIPLES: HashSet<&'static str> = [
        "often", "open", "even", "seven", "eleven", "garden", "kitchen",
        "children", "then", "when", "need", "speed", "feed", "seed",
        "indeed", "hundred", "kindred", "sacred", "naked", "wicked",
        "ragged", "rugged", "sudden", "golden", "wooden", "woven", "heaven",
        "oxygen", "citizen", "token", "linen", "women", "dozen",
        "listen", "happen", "chicken", "screen", "green", "between",
        "proceed", "succeed", "exceed", "embed", "breed", "greed", "bleed",
        "shed", "bed", "red", "wed", "weed", "deed", "heed",
    ]
    .into_iter()
    .collect();
}

/// Lowercase a token and strip surrounding punctuation.
fn normalize(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn is_participle(word: &str) -> bool {
    if IRREGULAR_PARTICIPLES.contains(word) {
        return true;
    }
    word.chars().count() >= 4
        && word.chars().all(|c| c.is_alphabetic())
        && (word.ends_with("ed") || word.ends_with("en"))
        && !NOT_PARTICIPLES.contains(word)
}

/// `not` or an `-ly` adverb may sit between the auxiliary and the participle.
fn is_modifier(word: &str) -> bool {
    word == "not" || (word.len() >= 4 && word.ends_with("ly"))
}

/// True when a "to be" form is followed by a participle-like word.
pub(crate) fn is_passive(sentence: &str) -> bool {
    let words: Vec<String> = sentence
        .split_whitespace()
        .map(normalize)
        .filter(|w| !w.is_empty())
        .collect();

    words.iter().enumerate().any(|(i, word)| {
        if !TO_BE.contains(word.as_str()) {
            return false;
        }
        match words.get(i + 1) {
            Some(next) if is_participle(next) => true,
            Some(next) if is_modifier(next) => {
                words.get(i + 2).is_some_and(|w| is_participle(w))
            }
            _ => false,
        }
    })
}

pub(crate) fn passive_voice(identifier: &str, threshold: f64, ctx: &RuleContext) -> Option<Violation> {
    let all = sentences(ctx.text);
    if all.is_empty() {
        return None;
    }

    let passive = all.iter().filter(|s| is_passive(s)).count();
    let ratio = passive as f64 / all.len() as f64;
    if ratio <= threshold {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!(
            "Passive voice ratio ({:.2}) exceeds maximum ({})",
            ratio, threshold
        ),
        json!({
            "ratio": ratio,
            "threshold": threshold,
            "passive_sentences": passive,
            "total_sentences": all.len(),
        }),
    ))
}

/// Sentences equal after trimming and case-folding.
pub(crate) fn duplicate_sentences(identifier: &str, ctx: &RuleContext) -> Option<Violation> {
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (index, sentence) in sentences(ctx.text).into_iter().enumerate() {
        let folded = sentence.to_lowercase();
        match first_seen.get(&folded) {
            Some(&first_index) => duplicates.push(json!({
                "sentence": sentence,
                "first_index": first_index,
                "duplicate_index": index,
            })),
            None => {
                first_seen.insert(folded, index);
            }
        }
    }

    if duplicates.is_empty() {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!("Duplicate sentences found: {} instance(s)", duplicates.len()),
        json!({ "duplicates": duplicates }),
    ))
}

pub(crate) fn heading_max_depth(identifier: &str, max_depth: usize, ctx: &RuleContext) -> Option<Violation> {
    let headings: Vec<_> = ctx
        .text
        .lines()
        .enumerate()
        .filter_map(|(i, line)| heading_depth(line).map(|depth| (i + 1, depth)))
        .filter(|&(_, depth)| depth > max_depth)
        .map(|(line, depth)| json!({ "line": line, "depth": depth }))
        .collect();

    if headings.is_empty() {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!(
            "{} heading(s) deeper than level {}",
            headings.len(),
            max_depth
        ),
        json!({ "max_depth": max_depth, "headings": headings }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passive_detection() {
        assert!(is_passive("The product was made in Italy"));
        assert!(is_passive("Reports are generated nightly"));
        assert!(is_passive("The box was carefully packed"));
        assert!(is_passive("It is not recommended"));
        assert!(is_passive("The letter had been written"));
    }

    #[test]
    fn test_active_sentences_are_not_passive() {
        assert!(!is_passive("The team built the product"));
        assert!(!is_passive("We are seeing strong growth"));
        assert!(!is_passive("The store is open on Sundays"));
        assert!(!is_passive("It is often late"));
        assert!(!is_passive("This is red"));
        assert!(!is_passive("There were seven of them"));
    }

    #[test]
    fn test_passive_ratio_over_threshold() {
        let ctx = RuleContext::text_only(
            "The cake was baked by Sam. Sam loves cake. The oven was cleaned afterwards. We ate.",
        );
        let v = passive_voice("max_passive_voice_ratio", 0.3, &ctx).unwrap();
        assert_eq!(
            v.details,
            Some(json!({
                "ratio": 0.5,
                "threshold": 0.3,
                "passive_sentences": 2,
                "total_sentences": 4,
            }))
        );
        assert!(passive_voice("max_passive_voice_ratio", 0.5, &ctx).is_none());
    }

    #[test]
    fn test_passive_ratio_of_empty_text() {
        let ctx = RuleContext::text_only("   ");
        assert!(passive_voice("max_passive_voice_ratio", 0.0, &ctx).is_none());
    }

    #[test]
    fn test_duplicate_sentences() {
        let ctx = RuleContext::text_only("Buy now. Great value! buy NOW. Great value? Done.");
        let v = duplicate_sentences("no_duplicate_sentences", &ctx).unwrap();
        assert_eq!(
            v.details,
            Some(json!({
                "duplicates": [
                    { "sentence": "buy NOW", "first_index": 0, "duplicate_index": 2 },
                    { "sentence": "Great value", "first_index": 1, "duplicate_index": 3 },
                ]
            }))
        );
    }

    #[test]
    fn test_no_duplicates() {
        let ctx = RuleContext::text_only("One. Two. Three.");
        assert!(duplicate_sentences("no_duplicate_sentences", &ctx).is_none());
    }

    #[test]
    fn test_heading_depth() {
        let ctx = RuleContext::text_only("# Title\n## Section\n#### Too deep\ntext\n### Ok");
        let v = heading_max_depth("heading_max_depth", 3, &ctx).unwrap();
        assert_eq!(
            v.details,
            Some(json!({ "max_depth": 3, "headings": [{ "line": 3, "depth": 4 }] }))
        );
        assert!(heading_max_depth("heading_max_depth", 4, &ctx).is_none());
    }
}
