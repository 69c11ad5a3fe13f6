//! Case-insensitive keyword presence rules.

use serde_json::json;

use crate::types::Violation;

use super::RuleContext;

/// Every keyword must appear somewhere in the text.
pub(crate) fn must_include(identifier: &str, keywords: &[String], ctx: &RuleContext) -> Option<Violation> {
    let haystack = ctx.text.to_lowercase();
    let missing: Vec<&String> = keywords
        .iter()
        .filter(|kw| !haystack.contains(&kw.to_lowercase()))
        .collect();

    if missing.is_empty() {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!("Must include keyword(s): {}", quoted(&missing)),
        json!({ "missing": missing, "expected": keywords }),
    ))
}

/// No keyword may appear anywhere in the text.
pub(crate) fn must_not_include(
    identifier: &str,
    keywords: &[String],
    ctx: &RuleContext,
) -> Option<Violation> {
    let haystack = ctx.text.to_lowercase();
    let found: Vec<&String> = keywords
        .iter()
        .filter(|kw| haystack.contains(&kw.to_lowercase()))
        .collect();

    if found.is_empty() {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!("Must not include keyword(s): {}", quoted(&found)),
        json!({ "found": found, "expected": keywords }),
    ))
}

fn quoted(words: &[&String]) -> String {
    words
        .iter()
        .map(|w| format!("'{}'", w))
        .collect::<Vec<_>>()
        .join(", ")
}
