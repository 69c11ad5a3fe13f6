//! Rule declarations.
//!
//! Rules arrive as `{rule_kind: params}` entries. Each kind has exactly one
//! parameter shape; anything else is rejected here so that evaluators never
//! see malformed parameters.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::parser::ContractError;
use super::pattern::Pattern;

/// Word distance used by `phrase_proximity` when `max_distance` is omitted.
pub const DEFAULT_PROXIMITY_DISTANCE: usize = 10;

/// Every rule kind the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    KeywordMustInclude,
    KeywordMustNotInclude,
    NoPlaceholderText,
    RegexMustMatch,
    SectionMustStartWith,
    ListItemPattern,
    WordCountMin,
    WordCountMax,
    MinListItems,
    MaxListItems,
    MaxPassiveVoiceRatio,
    NoDuplicateSentences,
    PhraseProximity,
    PhraseOrder,
    HeadingMaxDepth,
}

impl RuleKind {
    pub const ALL: [RuleKind; 15] = [
        RuleKind::KeywordMustInclude,
        RuleKind::KeywordMustNotInclude,
        RuleKind::NoPlaceholderText,
        RuleKind::RegexMustMatch,
        RuleKind::SectionMustStartWith,
        RuleKind::ListItemPattern,
        RuleKind::WordCountMin,
        RuleKind::WordCountMax,
        RuleKind::MinListItems,
        RuleKind::MaxListItems,
        RuleKind::MaxPassiveVoiceRatio,
        RuleKind::NoDuplicateSentences,
        RuleKind::PhraseProximity,
        RuleKind::PhraseOrder,
        RuleKind::HeadingMaxDepth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::KeywordMustInclude => "keyword_must_include",
            RuleKind::KeywordMustNotInclude => "keyword_must_not_include",
            RuleKind::NoPlaceholderText => "no_placeholder_text",
            RuleKind::RegexMustMatch => "regex_must_match",
            RuleKind::SectionMustStartWith => "section_must_start_with",
            RuleKind::ListItemPattern => "list_item_pattern",
            RuleKind::WordCountMin => "word_count_min",
            RuleKind::WordCountMax => "word_count_max",
            RuleKind::MinListItems => "min_list_items",
            RuleKind::MaxListItems => "max_list_items",
            RuleKind::MaxPassiveVoiceRatio => "max_passive_voice_ratio",
            RuleKind::NoDuplicateSentences => "no_duplicate_sentences",
            RuleKind::PhraseProximity => "phrase_proximity",
            RuleKind::PhraseOrder => "phrase_order",
            RuleKind::HeadingMaxDepth => "heading_max_depth",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized rule: one variant per kind, each with its own parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    KeywordMustInclude {
        keywords: Vec<String>,
    },
    KeywordMustNotInclude {
        keywords: Vec<String>,
    },
    NoPlaceholderText {
        pattern: Pattern,
    },
    RegexMustMatch {
        pattern: Pattern,
    },
    SectionMustStartWith {
        pattern: Pattern,
    },
    ListItemPattern {
        pattern: Pattern,
    },
    WordCountMin {
        threshold: usize,
    },
    WordCountMax {
        threshold: usize,
    },
    MinListItems {
        threshold: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    MaxListItems {
        threshold: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
    MaxPassiveVoiceRatio {
        threshold: f64,
    },
    NoDuplicateSentences {
        enabled: bool,
    },
    PhraseProximity {
        terms: [String; 2],
        max_distance: usize,
    },
    PhraseOrder {
        first: String,
        then: String,
    },
    HeadingMaxDepth {
        max_depth: usize,
    },
}

impl RuleSpec {
    /// Parse one `{kind: params}` pair.
    pub fn from_entry(kind_name: &str, params: &Value) -> Result<Self, ContractError> {
        let kind = RuleKind::parse(kind_name)
            .ok_or_else(|| ContractError::UnknownRuleKind(kind_name.to_string()))?;
        let p = Params { kind, value: params };

        let rule = match kind {
            RuleKind::KeywordMustInclude => RuleSpec::KeywordMustInclude {
                keywords: p.keywords()?,
            },
            RuleKind::KeywordMustNotInclude => RuleSpec::KeywordMustNotInclude {
                keywords: p.keywords()?,
            },
            RuleKind::NoPlaceholderText => RuleSpec::NoPlaceholderText {
                pattern: p.pattern()?,
            },
            RuleKind::RegexMustMatch => RuleSpec::RegexMustMatch {
                pattern: p.pattern()?,
            },
            RuleKind::SectionMustStartWith => RuleSpec::SectionMustStartWith {
                pattern: p.pattern()?,
            },
            RuleKind::ListItemPattern => RuleSpec::ListItemPattern {
                pattern: p.pattern()?,
            },
            RuleKind::WordCountMin => RuleSpec::WordCountMin {
                threshold: p.count(p.value)?,
            },
            RuleKind::WordCountMax => RuleSpec::WordCountMax {
                threshold: p.count(p.value)?,
            },
            RuleKind::MinListItems => {
                let (threshold, field) = p.list_count()?;
                RuleSpec::MinListItems { threshold, field }
            }
            RuleKind::MaxListItems => {
                let (threshold, field) = p.list_count()?;
                RuleSpec::MaxListItems { threshold, field }
            }
            RuleKind::MaxPassiveVoiceRatio => RuleSpec::MaxPassiveVoiceRatio {
                threshold: p.ratio()?,
            },
            RuleKind::NoDuplicateSentences => RuleSpec::NoDuplicateSentences {
                enabled: p
                    .value
                    .as_bool()
                    .ok_or_else(|| p.malformed("expected true or false"))?,
            },
            RuleKind::PhraseProximity => {
                let map = p.mapping(&["terms", "max_distance"])?;
                let terms = match map.get("terms") {
                    Some(Value::Array(items)) if items.len() == 2 => {
                        [p.phrase(&items[0])?, p.phrase(&items[1])?]
                    }
                    _ => return Err(p.malformed("'terms' must be a list of exactly 2 strings")),
                };
                let max_distance = match map.get("max_distance") {
                    None | Some(Value::Null) => DEFAULT_PROXIMITY_DISTANCE,
                    Some(v) => p.count(v)?,
                };
                RuleSpec::PhraseProximity {
                    terms,
                    max_distance,
                }
            }
            RuleKind::PhraseOrder => {
                let map = p.mapping(&["first", "then"])?;
                let field = |key: &str| {
                    map.get(key)
                        .ok_or_else(|| p.malformed(format!("missing '{}'", key)))
                        .and_then(|v| p.phrase(v))
                };
                RuleSpec::PhraseOrder {
                    first: field("first")?,
                    then: field("then")?,
                }
            }
            RuleKind::HeadingMaxDepth => {
                let max_depth = p.count(p.value)?;
                if max_depth == 0 {
                    return Err(p.malformed("heading depth must be at least 1"));
                }
                RuleSpec::HeadingMaxDepth { max_depth }
            }
        };

        Ok(rule)
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleSpec::KeywordMustInclude { .. } => RuleKind::KeywordMustInclude,
            RuleSpec::KeywordMustNotInclude { .. } => RuleKind::KeywordMustNotInclude,
            RuleSpec::NoPlaceholderText { .. } => RuleKind::NoPlaceholderText,
            RuleSpec::RegexMustMatch { .. } => RuleKind::RegexMustMatch,
            RuleSpec::SectionMustStartWith { .. } => RuleKind::SectionMustStartWith,
            RuleSpec::ListItemPattern { .. } => RuleKind::ListItemPattern,
            RuleSpec::WordCountMin { .. } => RuleKind::WordCountMin,
            RuleSpec::WordCountMax { .. } => RuleKind::WordCountMax,
            RuleSpec::MinListItems { .. } => RuleKind::MinListItems,
            RuleSpec::MaxListItems { .. } => RuleKind::MaxListItems,
            RuleSpec::MaxPassiveVoiceRatio { .. } => RuleKind::MaxPassiveVoiceRatio,
            RuleSpec::NoDuplicateSentences { .. } => RuleKind::NoDuplicateSentences,
            RuleSpec::PhraseProximity { .. } => RuleKind::PhraseProximity,
            RuleSpec::PhraseOrder { .. } => RuleKind::PhraseOrder,
            RuleSpec::HeadingMaxDepth { .. } => RuleKind::HeadingMaxDepth,
        }
    }
}

/// Parameter accessors that report errors against the rule kind.
struct Params<'v> {
    kind: RuleKind,
    value: &'v Value,
}

impl<'v> Params<'v> {
    fn malformed(&self, reason: impl Into<String>) -> ContractError {
        ContractError::MalformedRule {
            kind: self.kind,
            reason: reason.into(),
        }
    }

    /// One string or a list of strings, normalized to a non-empty list.
    fn keywords(&self) -> Result<Vec<String>, ContractError> {
        let keywords = match self.value {
            Value::String(s) => vec![self.phrase(&Value::String(s.clone()))?],
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(|item| self.phrase(item))
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(self.malformed("expected a keyword or a non-empty list of keywords")),
        };
        Ok(keywords)
    }

    /// A non-blank string.
    fn phrase(&self, value: &Value) -> Result<String, ContractError> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            _ => Err(self.malformed(format!("expected a non-empty string, found {}", value))),
        }
    }

    fn pattern(&self) -> Result<Pattern, ContractError> {
        let source = self
            .value
            .as_str()
            .ok_or_else(|| self.malformed("expected a regex pattern string"))?;
        Pattern::case_insensitive(source).map_err(|source| ContractError::InvalidPattern {
            location: format!("rule '{}'", self.kind),
            source,
        })
    }

    fn count(&self, value: &Value) -> Result<usize, ContractError> {
        value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.malformed(format!("expected a non-negative integer, found {}", value)))
    }

    fn ratio(&self) -> Result<f64, ContractError> {
        match self.value.as_f64() {
            Some(r) if (0.0..=1.0).contains(&r) => Ok(r),
            _ => Err(self.malformed(format!(
                "expected a ratio between 0 and 1, found {}",
                self.value
            ))),
        }
    }

    /// `3` or `{count: 3, field: features}`.
    fn list_count(&self) -> Result<(usize, Option<String>), ContractError> {
        if self.value.is_number() {
            return Ok((self.count(self.value)?, None));
        }

        let map = self.mapping(&["count", "field"])?;
        let threshold = map
            .get("count")
            .ok_or_else(|| self.malformed("missing 'count'"))
            .and_then(|v| self.count(v))?;
        let field = match map.get("field") {
            None | Some(Value::Null) => None,
            Some(v) => Some(self.phrase(v)?),
        };
        Ok((threshold, field))
    }

    /// A mapping restricted to the given keys.
    fn mapping(&self, allowed: &[&str]) -> Result<&'v Map<String, Value>, ContractError> {
        let map = self
            .value
            .as_object()
            .ok_or_else(|| self.malformed(format!("expected a mapping with keys {:?}", allowed)))?;

        if let Some(key) = map.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(self.malformed(format!("unknown parameter '{}'", key)));
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_kind_round_trips_its_name() {
        for kind in RuleKind::ALL {
            assert_eq!(RuleKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RuleKind::parse("include"), None);
    }

    #[test]
    fn test_keyword_list_and_scalar() {
        let scalar = RuleSpec::from_entry("keyword_must_include", &json!("quality")).unwrap();
        let list = RuleSpec::from_entry("keyword_must_include", &json!(["quality"])).unwrap();
        assert_eq!(scalar, list);
    }

    #[test]
    fn test_keyword_rejects_empty_and_non_strings() {
        for params in [json!([]), json!(""), json!(["ok", 3]), json!({"a": 1})] {
            assert!(
                matches!(
                    RuleSpec::from_entry("keyword_must_not_include", &params),
                    Err(ContractError::MalformedRule { .. })
                ),
                "params {} should be rejected",
                params
            );
        }
    }

    #[test]
    fn test_word_count_requires_non_negative_integer() {
        assert_eq!(
            RuleSpec::from_entry("word_count_min", &json!(100)).unwrap(),
            RuleSpec::WordCountMin { threshold: 100 }
        );
        assert!(RuleSpec::from_entry("word_count_min", &json!(-1)).is_err());
        assert!(RuleSpec::from_entry("word_count_max", &json!(2.5)).is_err());
        assert!(RuleSpec::from_entry("word_count_max", &json!("100")).is_err());
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(RuleSpec::from_entry("max_passive_voice_ratio", &json!(0.3)).is_ok());
        assert!(RuleSpec::from_entry("max_passive_voice_ratio", &json!(1)).is_ok());
        assert!(RuleSpec::from_entry("max_passive_voice_ratio", &json!(1.5)).is_err());
        assert!(RuleSpec::from_entry("max_passive_voice_ratio", &json!(-0.1)).is_err());
    }

    #[test]
    fn test_phrase_proximity_defaults_distance() {
        let rule =
            RuleSpec::from_entry("phrase_proximity", &json!({"terms": ["warranty", "30"]})).unwrap();
        assert_eq!(
            rule,
            RuleSpec::PhraseProximity {
                terms: ["warranty".to_string(), "30".to_string()],
                max_distance: DEFAULT_PROXIMITY_DISTANCE,
            }
        );
    }

    #[test]
    fn test_phrase_proximity_requires_two_terms() {
        let three = json!({"terms": ["a", "b", "c"], "max_distance": 5});
        assert!(RuleSpec::from_entry("phrase_proximity", &three).is_err());
        let extra = json!({"terms": ["a", "b"], "distance": 5});
        assert!(RuleSpec::from_entry("phrase_proximity", &extra).is_err());
    }

    #[test]
    fn test_phrase_order_requires_both_phrases() {
        assert!(RuleSpec::from_entry("phrase_order", &json!({"first": "features"})).is_err());
        let rule =
            RuleSpec::from_entry("phrase_order", &json!({"first": "features", "then": "buy now"}))
                .unwrap();
        assert_eq!(rule.kind(), RuleKind::PhraseOrder);
    }

    #[test]
    fn test_list_count_shapes() {
        assert_eq!(
            RuleSpec::from_entry("min_list_items", &json!(3)).unwrap(),
            RuleSpec::MinListItems {
                threshold: 3,
                field: None
            }
        );
        assert_eq!(
            RuleSpec::from_entry("max_list_items", &json!({"count": 5, "field": "features"}))
                .unwrap(),
            RuleSpec::MaxListItems {
                threshold: 5,
                field: Some("features".to_string())
            }
        );
    }

    #[test]
    fn test_duplicate_sentences_requires_bool() {
        assert!(RuleSpec::from_entry("no_duplicate_sentences", &json!(true)).is_ok());
        assert!(RuleSpec::from_entry("no_duplicate_sentences", &json!("yes")).is_err());
    }

    #[test]
    fn test_heading_depth_must_be_positive() {
        assert!(RuleSpec::from_entry("heading_max_depth", &json!(0)).is_err());
        assert!(RuleSpec::from_entry("heading_max_depth", &json!(3)).is_ok());
    }

    #[test]
    fn test_rule_serializes_with_kind_tag() {
        let rule = RuleSpec::from_entry("regex_must_match", &json!("\\d+ USD")).unwrap();
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value, json!({"kind": "regex_must_match", "pattern": "\\d+ USD"}));
    }
}
