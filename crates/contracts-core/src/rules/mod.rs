//! Content rule evaluators.
//!
//! Each rule is evaluated on its own against the candidate's textual form.
//! Evaluators share nothing but the read-only [`RuleContext`], so rules can
//! run in any order (or in parallel) and the result depends only on the rule
//! and the candidate.
//!
//! Evaluation is total: a well-formed rule (and the contract loader only
//! produces well-formed rules) yields either a pass or one violation.

mod counts;
mod keywords;
mod patterns;
mod phrases;
mod style;
mod text;

use serde_json::Value;

use crate::contract::{FieldSpec, RuleSpec};
use crate::types::Violation;

use counts::Bound;

/// Read-only view of the candidate that rules evaluate against.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Textual form of the candidate
    pub text: &'a str,

    /// Structured form, when the candidate could be interpreted as an object
    pub structured: Option<&'a Value>,

    /// Field declarations of the contract, used to resolve list fields
    pub fields: &'a [FieldSpec],
}

impl<'a> RuleContext<'a> {
    pub fn new(text: &'a str, structured: Option<&'a Value>, fields: &'a [FieldSpec]) -> Self {
        Self {
            text,
            structured,
            fields,
        }
    }

    /// Context for plain text with no structured form.
    pub fn text_only(text: &'a str) -> Self {
        Self::new(text, None, &[])
    }
}

/// Evaluate a single rule. Returns `None` when the rule passes.
pub fn evaluate_rule(rule: &RuleSpec, ctx: &RuleContext) -> Option<Violation> {
    let id = rule.kind().as_str();

    match rule {
        RuleSpec::KeywordMustInclude { keywords } => keywords::must_include(id, keywords, ctx),
        RuleSpec::KeywordMustNotInclude { keywords } => {
            keywords::must_not_include(id, keywords, ctx)
        }
        RuleSpec::NoPlaceholderText { pattern } => patterns::no_placeholder(id, pattern, ctx),
        RuleSpec::RegexMustMatch { pattern } => patterns::must_match(id, pattern, ctx),
        RuleSpec::SectionMustStartWith { pattern } => {
            patterns::section_starts_with(id, pattern, ctx)
        }
        RuleSpec::ListItemPattern { pattern } => patterns::list_items_match(id, pattern, ctx),
        RuleSpec::WordCountMin { threshold } => counts::words(id, Bound::Min, *threshold, ctx),
        RuleSpec::WordCountMax { threshold } => counts::words(id, Bound::Max, *threshold, ctx),
        RuleSpec::MinListItems { threshold, field } => {
            counts::list_items(id, Bound::Min, *threshold, field.as_deref(), ctx)
        }
        RuleSpec::MaxListItems { threshold, field } => {
            counts::list_items(id, Bound::Max, *threshold, field.as_deref(), ctx)
        }
        RuleSpec::MaxPassiveVoiceRatio { threshold } => style::passive_voice(id, *threshold, ctx),
        RuleSpec::NoDuplicateSentences { enabled } => {
            if *enabled {
                style::duplicate_sentences(id, ctx)
            } else {
                None
            }
        }
        RuleSpec::HeadingMaxDepth { max_depth } => style::heading_max_depth(id, *max_depth, ctx),
        RuleSpec::PhraseProximity {
            terms,
            max_distance,
        } => phrases::proximity(id, terms, *max_distance, ctx),
        RuleSpec::PhraseOrder { first, then } => phrases::order(id, first, then, ctx),
    }
}

/// Evaluate rules in order, keeping one slot per failing rule.
pub fn evaluate_rules(rules: &[RuleSpec], ctx: &RuleContext) -> Vec<Violation> {
    rules
        .iter()
        .filter_map(|rule| {
            let violation = evaluate_rule(rule, ctx);
            tracing::trace!(rule = rule.kind().as_str(), passed = violation.is_none());
            violation
        })
        .collect()
}
