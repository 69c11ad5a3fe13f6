//! Regex-driven rules.

use serde_json::json;

use crate::contract::Pattern;
use crate::types::Violation;

use super::text::NUMBERED_ITEM;
use super::RuleContext;

/// Fails on the first match of a placeholder pattern.
pub(crate) fn no_placeholder(identifier: &str, pattern: &Pattern, ctx: &RuleContext) -> Option<Violation> {
    let m = pattern.regex().find(ctx.text)?;
    Some(Violation::rule(
        identifier,
        format!(
            "Contains placeholder text '{}' matching pattern '{}'",
            m.as_str(),
            pattern.as_str()
        ),
        json!({
            "pattern": pattern.as_str(),
            "match": m.as_str(),
            "start": m.start(),
            "end": m.end(),
        }),
    ))
}

pub(crate) fn must_match(identifier: &str, pattern: &Pattern, ctx: &RuleContext) -> Option<Violation> {
    if pattern.is_match(ctx.text) {
        return None;
    }
    Some(Violation::rule(
        identifier,
        format!("Content must match regex pattern: '{}'", pattern.as_str()),
        json!({ "pattern": pattern.as_str() }),
    ))
}

/// The trimmed text must open with a match.
pub(crate) fn section_starts_with(
    identifier: &str,
    pattern: &Pattern,
    ctx: &RuleContext,
) -> Option<Violation> {
    if pattern.matches_at_start(ctx.text.trim()) {
        return None;
    }
    Some(Violation::rule(
        identifier,
        format!("Content must start with pattern: '{}'", pattern.as_str()),
        json!({ "pattern": pattern.as_str() }),
    ))
}

/// Every numbered list line must open with a match. Bullet lines are ignored.
pub(crate) fn list_items_match(
    identifier: &str,
    pattern: &Pattern,
    ctx: &RuleContext,
) -> Option<Violation> {
    let offending: Vec<_> = ctx
        .text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| NUMBERED_ITEM.is_match(line) && !pattern.matches_at_start(line))
        .map(|(line, text)| json!({ "line": line, "text": text }))
        .collect();

    if offending.is_empty() {
        return None;
    }

    Some(Violation::rule(
        identifier,
        format!(
            "{} list item(s) do not match pattern '{}'",
            offending.len(),
            pattern.as_str()
        ),
        json!({ "pattern": pattern.as_str(), "lines": offending }),
    ))
}
