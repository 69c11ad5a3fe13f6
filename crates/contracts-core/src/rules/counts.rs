//! Word-count and list-length rules.

use serde_json::{json, Value};

use crate::contract::FieldType;
use crate::types::Violation;

use super::text::word_count;
use super::RuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Min,
    Max,
}

impl Bound {
    fn violated(self, actual: usize, threshold: usize) -> bool {
        match self {
            Bound::Min => actual < threshold,
            Bound::Max => actual > threshold,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Bound::Min => "below minimum",
            Bound::Max => "above maximum",
        }
    }
}

pub(crate) fn words(identifier: &str, bound: Bound, threshold: usize, ctx: &RuleContext) -> Option<Violation> {
    let actual = word_count(ctx.text);
    if !bound.violated(actual, threshold) {
        return None;
    }
    Some(Violation::rule(
        identifier,
        format!("Word count ({}) {} ({})", actual, bound.describe(), threshold),
        json!({ "actual": actual, "threshold": threshold }),
    ))
}

/// Item count of a list field in the structured candidate.
///
/// Not applicable (passes) when the candidate is not structured or no list
/// field can be resolved.
pub(crate) fn list_items(
    identifier: &str,
    bound: Bound,
    threshold: usize,
    field: Option<&str>,
    ctx: &RuleContext,
) -> Option<Violation> {
    let structured = ctx.structured?;
    let (name, items) = resolve_list_field(structured, field, ctx)?;

    let actual = items.len();
    if !bound.violated(actual, threshold) {
        return None;
    }
    Some(Violation::rule(
        identifier,
        format!(
            "List '{}' has {} item(s), {} ({})",
            name,
            actual,
            bound.describe(),
            threshold
        ),
        json!({ "field": name, "actual": actual, "threshold": threshold }),
    ))
}

/// Explicit field, else the first declared list field, else the first
/// array-valued top-level key.
fn resolve_list_field<'a>(
    structured: &'a Value,
    explicit: Option<&'a str>,
    ctx: &'a RuleContext,
) -> Option<(&'a str, &'a Vec<Value>)> {
    let object = structured.as_object()?;

    let declared = ctx
        .fields
        .iter()
        .find(|f| f.field_type == FieldType::List)
        .map(|f| f.name.as_str());

    match explicit.or(declared) {
        Some(name) => object.get(name)?.as_array().map(|items| (name, items)),
        None => object
            .iter()
            .find_map(|(key, value)| value.as_array().map(|items| (key.as_str(), items))),
    }
}
