//! Contract parsing from YAML/JSON.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::fields::{parse_fields, FieldSpec, FieldType};
use super::rules::{RuleKind, RuleSpec};

/// Maximum nesting of `include` rule bundles.
pub const MAX_INCLUDE_DEPTH: usize = 8;

/// Keys allowed at the top level of a contract document.
const CONTRACT_KEYS: &[&str] = &["name", "description", "schema", "fields", "rules"];

/// Keys allowed at the top level of a rule bundle document.
const BUNDLE_KEYS: &[&str] = &["name", "description", "rules"];

/// Errors that can occur when loading contracts.
///
/// All of these are fatal to the load call and are never produced by
/// validation itself.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Failed to read contract file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid contract shape: {0}")]
    InvalidShape(String),

    #[error("Unknown contract key: '{0}'")]
    UnknownKey(String),

    #[error("Field '{field}' has unknown type '{field_type}'")]
    UnknownFieldType { field: String, field_type: String },

    #[error("Field '{field}' of type {field_type} does not accept constraint '{key}'")]
    UnknownConstraint {
        field: String,
        field_type: FieldType,
        key: String,
    },

    #[error("Field '{field}' has an invalid constraint: {reason}")]
    InvalidConstraint { field: String, reason: String },

    #[error("Unknown rule kind: '{0}'")]
    UnknownRuleKind(String),

    #[error("Malformed parameters for rule '{kind}': {reason}")]
    MalformedRule { kind: RuleKind, reason: String },

    #[error("Invalid regex in {location}: {source}")]
    InvalidPattern {
        location: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cannot include rule bundle {path:?}: {reason}")]
    Include { path: PathBuf, reason: String },
}

/// A loaded, normalized contract.
///
/// Immutable after loading; safe to share across threads and reuse for any
/// number of candidates.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Contract {
    /// Human-readable name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Field declarations in declaration order
    pub fields: Vec<FieldSpec>,

    /// Rules in contract order, bundles already spliced in
    pub rules: Vec<RuleSpec>,
}

impl Contract {
    /// Parse a contract from a YAML string.
    ///
    /// `include` paths resolve against the current directory.
    pub fn from_yaml(yaml: &str) -> Result<Self, ContractError> {
        let raw = parse_yaml(yaml)?;
        Loader::default().load_contract(&raw, None)
    }

    /// Parse a contract from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ContractError> {
        let raw: Value = serde_json::from_str(json)?;
        Loader::default().load_contract(&raw, None)
    }

    /// Load a contract from an already-parsed document.
    pub fn from_value(raw: &Value) -> Result<Self, ContractError> {
        Loader::default().load_contract(raw, None)
    }

    /// Parse a contract from a YAML file. Includes resolve relative to it.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let raw = parse_yaml(&fs::read_to_string(path)?)?;
        Loader::rooted_at(path).load_contract(&raw, path.parent())
    }

    /// Parse a contract from a JSON file. Includes resolve relative to it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let raw: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        Loader::rooted_at(path).load_contract(&raw, path.parent())
    }

    /// Load a contract file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        if is_json_path(path) {
            Self::from_json_file(path)
        } else {
            Self::from_yaml_file(path)
        }
    }

    fn empty() -> Self {
        Contract {
            name: None,
            description: None,
            fields: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Whether the contract declares any structural fields.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Look up a field declaration by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared list fields, in declaration order.
    pub fn list_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::List)
    }
}

/// Recursive loader that tracks the include chain for cycle detection.
#[derive(Default)]
struct Loader {
    include_stack: Vec<PathBuf>,
    /// Bundles currently open; the root document is not counted.
    depth: usize,
}

impl Loader {
    fn rooted_at(path: &Path) -> Self {
        let root = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self {
            include_stack: vec![root],
            depth: 0,
        }
    }

    fn load_contract(
        &mut self,
        raw: &Value,
        base_dir: Option<&Path>,
    ) -> Result<Contract, ContractError> {
        let doc = match raw {
            Value::Object(map) => map,
            Value::Null => return Ok(Contract::empty()),
            other => {
                return Err(ContractError::InvalidShape(format!(
                    "contract must be a mapping, found {}",
                    crate::types::json_type_name(other)
                )))
            }
        };

        check_keys(doc, CONTRACT_KEYS)?;

        let schema = match (doc.get("schema"), doc.get("fields")) {
            (Some(_), Some(_)) => {
                return Err(ContractError::InvalidShape(
                    "use either 'schema' or 'fields', not both".to_string(),
                ))
            }
            (Some(s), None) | (None, Some(s)) => Some(s),
            (None, None) => None,
        };

        let fields = match schema {
            Some(schema) => parse_fields(schema)?,
            None => Vec::new(),
        };

        let mut rules = Vec::new();
        if let Some(raw_rules) = doc.get("rules") {
            self.load_rules(raw_rules, base_dir, &mut rules)?;
        }

        let contract = Contract {
            name: optional_string(doc, "name")?,
            description: optional_string(doc, "description")?,
            fields,
            rules,
        };

        tracing::debug!(
            fields = contract.fields.len(),
            rules = contract.rules.len(),
            "contract loaded"
        );

        Ok(contract)
    }

    /// Normalize a rule list, splicing bundles in place.
    fn load_rules(
        &mut self,
        raw_rules: &Value,
        base_dir: Option<&Path>,
        out: &mut Vec<RuleSpec>,
    ) -> Result<(), ContractError> {
        let entries = match raw_rules {
            Value::Array(entries) => entries,
            Value::Null => return Ok(()),
            _ => {
                return Err(ContractError::InvalidShape(
                    "'rules' must be a list of {rule_kind: params} entries".to_string(),
                ))
            }
        };

        for entry in entries {
            let Value::Object(entry) = entry else {
                return Err(ContractError::InvalidShape(format!(
                    "rule entry must be a mapping, found {}",
                    entry
                )));
            };

            if entry.is_empty() {
                return Err(ContractError::InvalidShape(
                    "rule entry must name a rule kind".to_string(),
                ));
            }

            // A multi-key entry expands into one rule per key, in key order.
            for (kind, params) in entry {
                if kind == "include" {
                    let Some(target) = params.as_str() else {
                        return Err(ContractError::InvalidShape(
                            "'include' expects a file path".to_string(),
                        ));
                    };
                    self.load_bundle(target, base_dir, out)?;
                } else {
                    out.push(RuleSpec::from_entry(kind, params)?);
                }
            }
        }

        Ok(())
    }

    fn load_bundle(
        &mut self,
        target: &str,
        base_dir: Option<&Path>,
        out: &mut Vec<RuleSpec>,
    ) -> Result<(), ContractError> {
        let path = match base_dir {
            Some(dir) => dir.join(target),
            None => PathBuf::from(target),
        };

        let include_error = |reason: String| ContractError::Include {
            path: path.clone(),
            reason,
        };

        let canonical = fs::canonicalize(&path).map_err(|e| include_error(e.to_string()))?;

        if self.include_stack.contains(&canonical) {
            return Err(include_error("include cycle detected".to_string()));
        }
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(include_error(format!(
                "include depth exceeds {}",
                MAX_INCLUDE_DEPTH
            )));
        }

        let contents = fs::read_to_string(&canonical).map_err(|e| include_error(e.to_string()))?;
        let raw: Value = if is_json_path(&canonical) {
            serde_json::from_str(&contents).map_err(|e| include_error(e.to_string()))?
        } else {
            parse_yaml(&contents).map_err(|e| include_error(e.to_string()))?
        };

        let raw_rules = match &raw {
            Value::Array(_) => &raw,
            Value::Object(doc) => {
                check_keys(doc, BUNDLE_KEYS)
                    .map_err(|e| include_error(format!("bundles may only contain rules ({})", e)))?;
                doc.get("rules").unwrap_or(&Value::Null)
            }
            _ => {
                return Err(include_error(
                    "bundle must be a rule list or a mapping with 'rules'".to_string(),
                ))
            }
        };

        tracing::debug!(bundle = %canonical.display(), "including rule bundle");

        let bundle_dir = canonical.parent().map(Path::to_path_buf);
        self.include_stack.push(canonical);
        self.depth += 1;
        let result = self.load_rules(raw_rules, bundle_dir.as_deref(), out);
        self.depth -= 1;
        self.include_stack.pop();
        result
    }
}

/// Parse YAML through `serde_yaml::Value`, whose mappings reject repeated keys.
fn parse_yaml(text: &str) -> Result<Value, ContractError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(text)?;
    Ok(serde_json::to_value(doc)?)
}

fn check_keys(doc: &Map<String, Value>, allowed: &[&str]) -> Result<(), ContractError> {
    match doc.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ContractError::UnknownKey(key.clone())),
        None => Ok(()),
    }
}

fn optional_string(doc: &Map<String, Value>, key: &str) -> Result<Option<String>, ContractError> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ContractError::InvalidShape(format!(
            "'{}' must be a string",
            key
        ))),
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Constraints;
    use std::io::Write;

    const VALID_CONTRACT: &str = r#"
name: "Product Copy"
schema:
  title:
    type: string
    required: true
    min_length: 10
  price:
    type: int
    min: 0
rules:
  - keyword_must_include: "premium"
  - word_count_min: 50
  - phrase_order:
      first: "features"
      then: "buy now"
"#;

    #[test]
    fn test_parse_valid_contract() {
        let contract = Contract::from_yaml(VALID_CONTRACT).unwrap();
        assert_eq!(contract.name.as_deref(), Some("Product Copy"));
        assert_eq!(contract.fields.len(), 2);
        assert_eq!(contract.fields[0].name, "title");
        assert_eq!(contract.fields[1].name, "price");
        assert_eq!(contract.rules.len(), 3);
        assert_eq!(contract.rules[0].kind(), RuleKind::KeywordMustInclude);
    }

    #[test]
    fn test_keyword_scalar_normalized_to_list() {
        let contract = Contract::from_yaml(VALID_CONTRACT).unwrap();
        assert_eq!(
            contract.rules[0],
            RuleSpec::KeywordMustInclude {
                keywords: vec!["premium".to_string()]
            }
        );
    }

    #[test]
    fn test_json_contract_keeps_field_order() {
        let json = r#"{
            "fields": {
                "zeta": {"type": "string"},
                "alpha": {"type": "bool"}
            },
            "rules": []
        }"#;
        let contract = Contract::from_json(json).unwrap();
        let names: Vec<_> = contract.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_unknown_top_level_key() {
        let result = Contract::from_yaml("rulez: []");
        assert!(matches!(result, Err(ContractError::UnknownKey(ref k)) if k == "rulez"));
    }

    #[test]
    fn test_schema_and_fields_conflict() {
        let yaml = r#"
schema: {}
fields: {}
"#;
        assert!(matches!(
            Contract::from_yaml(yaml),
            Err(ContractError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_unknown_rule_kind() {
        let yaml = r#"
rules:
  - keyword_must_rhyme: ["moon"]
"#;
        assert!(matches!(
            Contract::from_yaml(yaml),
            Err(ContractError::UnknownRuleKind(ref k)) if k == "keyword_must_rhyme"
        ));
    }

    #[test]
    fn test_invalid_rule_regex_rejected_at_load() {
        let yaml = r#"
rules:
  - no_placeholder_text: "[YOUR_TEXT_HERE"
"#;
        assert!(matches!(
            Contract::from_yaml(yaml),
            Err(ContractError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_multi_key_rule_entry_expands_in_order() {
        let yaml = r#"
rules:
  - word_count_min: 5
    word_count_max: 500
"#;
        let contract = Contract::from_yaml(yaml).unwrap();
        let kinds: Vec<_> = contract.rules.iter().map(RuleSpec::kind).collect();
        assert_eq!(kinds, vec![RuleKind::WordCountMin, RuleKind::WordCountMax]);
    }

    #[test]
    fn test_empty_document_is_empty_contract() {
        let contract = Contract::from_yaml("").unwrap();
        assert!(!contract.has_fields());
        assert!(contract.rules.is_empty());
    }

    #[test]
    fn test_non_mapping_contract_rejected() {
        assert!(matches!(
            Contract::from_yaml("- 1\n- 2\n"),
            Err(ContractError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_include_bundle_spliced_in_place() {
        let dir = tempfile::tempdir().unwrap();

        let bundle_path = dir.path().join("common_rules.yaml");
        let mut bundle = fs::File::create(&bundle_path).unwrap();
        writeln!(
            bundle,
            "rules:\n  - keyword_must_not_include: [\"cheap\"]\n  - no_duplicate_sentences: true"
        )
        .unwrap();

        let contract_path = dir.path().join("contract.yaml");
        fs::write(
            &contract_path,
            "rules:\n  - word_count_min: 3\n  - include: common_rules.yaml\n  - word_count_max: 300\n",
        )
        .unwrap();

        let contract = Contract::from_file(&contract_path).unwrap();
        let kinds: Vec<_> = contract.rules.iter().map(RuleSpec::kind).collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::WordCountMin,
                RuleKind::KeywordMustNotInclude,
                RuleKind::NoDuplicateSentences,
                RuleKind::WordCountMax,
            ]
        );
    }

    #[test]
    fn test_include_cycle_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "rules:\n  - include: b.yaml\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "rules:\n  - include: a.yaml\n").unwrap();

        let result = Contract::from_file(dir.path().join("a.yaml"));
        match result {
            Err(ContractError::Include { reason, .. }) => assert!(reason.contains("cycle")),
            other => panic!("expected include cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_include_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.yaml");
        fs::write(&path, "rules:\n  - include: nowhere.yaml\n").unwrap();

        assert!(matches!(
            Contract::from_file(&path),
            Err(ContractError::Include { .. })
        ));
    }

    #[test]
    fn test_bundle_may_not_declare_schema() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle.yaml"), "schema: {}\nrules: []\n").unwrap();
        let path = dir.path().join("contract.yaml");
        fs::write(&path, "rules:\n  - include: bundle.yaml\n").unwrap();

        assert!(matches!(
            Contract::from_file(&path),
            Err(ContractError::Include { .. })
        ));
    }

    #[test]
    fn test_repeated_field_name_rejected() {
        let yaml = "schema:\n  price: { type: int, min: 0 }\n  price: { type: string }\n";
        assert!(matches!(
            Contract::from_yaml(yaml),
            Err(ContractError::YamlError(_))
        ));
    }

    #[test]
    fn test_repeated_key_in_bundle_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle.yaml"), "rules: []\nrules: []\n").unwrap();
        let path = dir.path().join("contract.yaml");
        fs::write(&path, "rules:\n  - include: bundle.yaml\n").unwrap();

        assert!(matches!(
            Contract::from_file(&path),
            Err(ContractError::Include { .. })
        ));
    }

    /// Writes `b1.yaml` .. `b{levels}.yaml`, each including the next.
    fn write_bundle_chain(dir: &Path, levels: usize) {
        for level in 1..levels {
            fs::write(
                dir.join(format!("b{}.yaml", level)),
                format!("rules:\n  - include: b{}.yaml\n", level + 1),
            )
            .unwrap();
        }
        fs::write(
            dir.join(format!("b{}.yaml", levels)),
            "rules:\n  - word_count_min: 1\n",
        )
        .unwrap();
    }

    #[test]
    fn test_include_depth_limit_from_file() {
        for (levels, loads) in [(MAX_INCLUDE_DEPTH, true), (MAX_INCLUDE_DEPTH + 1, false)] {
            let dir = tempfile::tempdir().unwrap();
            write_bundle_chain(dir.path(), levels);
            let path = dir.path().join("contract.yaml");
            fs::write(&path, "rules:\n  - include: b1.yaml\n").unwrap();

            let result = Contract::from_file(&path);
            assert_eq!(result.is_ok(), loads, "{} levels: {:?}", levels, result);
        }
    }

    #[test]
    fn test_include_depth_limit_from_memory() {
        for (levels, loads) in [(MAX_INCLUDE_DEPTH, true), (MAX_INCLUDE_DEPTH + 1, false)] {
            let dir = tempfile::tempdir().unwrap();
            write_bundle_chain(dir.path(), levels);
            let yaml = format!(
                "rules:\n  - include: '{}'\n",
                dir.path().join("b1.yaml").display()
            );

            match Contract::from_yaml(&yaml) {
                Ok(contract) => {
                    assert!(loads, "{} levels should fail", levels);
                    assert_eq!(contract.rules.len(), 1);
                }
                Err(ContractError::Include { reason, .. }) => {
                    assert!(!loads, "{} levels should load", levels);
                    assert!(reason.contains("depth"));
                }
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_list_fields() {
        let yaml = r#"
schema:
  title: {type: string}
  features: {type: list, min_items: 1, item_type: string}
  tags: {type: list}
"#;
        let contract = Contract::from_yaml(yaml).unwrap();
        let names: Vec<_> = contract.list_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["features", "tags"]);
        assert!(matches!(
            contract.field("features").unwrap().constraints,
            Constraints::List {
                min_items: Some(1),
                item_type: Some(FieldType::String),
                ..
            }
        ));
    }
}
