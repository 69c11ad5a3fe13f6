//! Field declarations and their type-specific constraints.
//!
//! Two authoring dialects are accepted:
//!
//! | Dialect | Shape |
//! |---------|-------|
//! | Native | `schema: { price: { type: int, required: true, min: 0 } }` |
//! | JSON-Schema style | `schema: { type: object, properties: {...}, required: [...] }` |
//!
//! The JSON-Schema dialect is selected when `schema.type` is a string. Both
//! dialects normalize to the same `FieldSpec` list, in declaration order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt;

use super::parser::ContractError;
use super::pattern::Pattern;

/// Keys that annotate a field without constraining it.
const ANNOTATION_KEYS: &[&str] = &["description", "title"];

/// Declared type of a structural field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    List,
    Object,
}

impl FieldType {
    /// Parse a type name, accepting JSON-Schema aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" | "str" => Some(FieldType::String),
            "int" | "integer" => Some(FieldType::Int),
            "float" | "number" => Some(FieldType::Float),
            "bool" | "boolean" => Some(FieldType::Bool),
            "list" | "array" => Some(FieldType::List),
            "object" | "dict" => Some(FieldType::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::List => "list",
            FieldType::Object => "object",
        }
    }

    /// Whether a JSON value conforms to this type.
    ///
    /// `int` accepts integral JSON numbers only; `float` accepts any number.
    /// `null` never conforms.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::List => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific constraints. Only the variant matching the field type
/// is ever constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Constraints {
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<Pattern>,
    },
    Numeric {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<Number>,
    },
    List {
        #[serde(skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        item_type: Option<FieldType>,
    },
    Object {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        required_subkeys: Vec<String>,
    },
    None,
}

impl Constraints {
    fn empty_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => Constraints::String {
                min_length: None,
                max_length: None,
                pattern: None,
            },
            FieldType::Int | FieldType::Float => Constraints::Numeric {
                min: None,
                max: None,
            },
            FieldType::List => Constraints::List {
                min_items: None,
                max_items: None,
                item_type: None,
            },
            FieldType::Object => Constraints::Object {
                required_subkeys: Vec::new(),
            },
            FieldType::Bool => Constraints::None,
        }
    }
}

/// Declaration of one structural field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub constraints: Constraints,
}

/// Parse the `schema` (or `fields`) section of a contract.
pub(crate) fn parse_fields(schema: &Value) -> Result<Vec<FieldSpec>, ContractError> {
    match schema {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) if map.get("type").is_some_and(Value::is_string) => {
            parse_json_schema(map)
        }
        Value::Object(map) => map
            .iter()
            .map(|(name, spec)| parse_native_field(name, spec))
            .collect(),
        _ => Err(ContractError::InvalidShape(
            "'schema' must be a mapping of field name to field spec".to_string(),
        )),
    }
}

fn parse_native_field(name: &str, spec: &Value) -> Result<FieldSpec, ContractError> {
    let spec = field_mapping(name, spec)?;
    let field_type = field_type_of(name, spec)?;

    let required = match spec.get("required") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(invalid(name, "'required' must be a boolean")),
    };

    let mut builder = ConstraintBuilder::new(name, field_type);
    for (key, value) in spec {
        if key == "type" || key == "required" || ANNOTATION_KEYS.contains(&key.as_str()) {
            continue;
        }
        builder.apply(key, value)?;
    }

    Ok(FieldSpec {
        name: name.to_string(),
        field_type,
        required,
        description: annotation(name, spec)?,
        constraints: builder.finish()?,
    })
}

fn parse_json_schema(schema: &Map<String, Value>) -> Result<Vec<FieldSpec>, ContractError> {
    const ROOT_KEYS: &[&str] = &["$schema", "type", "properties", "required", "description", "title"];

    if let Some(key) = schema.keys().find(|k| !ROOT_KEYS.contains(&k.as_str())) {
        return Err(ContractError::UnknownKey(format!("schema.{}", key)));
    }

    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(ContractError::InvalidShape(
            "JSON-Schema style 'schema' must have type: object".to_string(),
        ));
    }

    let required = string_list(schema.get("required"))
        .ok_or_else(|| ContractError::InvalidShape("'schema.required' must be a list of names".to_string()))?;

    let properties = match schema.get("properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(props)) => props.clone(),
        Some(_) => {
            return Err(ContractError::InvalidShape(
                "'schema.properties' must be a mapping".to_string(),
            ))
        }
    };

    if let Some(missing) = required.iter().find(|r| !properties.contains_key(r.as_str())) {
        return Err(ContractError::InvalidShape(format!(
            "required field '{}' is not declared in 'schema.properties'",
            missing
        )));
    }

    properties
        .iter()
        .map(|(name, spec)| {
            let is_required = required.iter().any(|r| r == name);
            parse_json_schema_property(name, spec, is_required)
        })
        .collect()
}

fn parse_json_schema_property(
    name: &str,
    spec: &Value,
    required: bool,
) -> Result<FieldSpec, ContractError> {
    let spec = field_mapping(name, spec)?;
    let field_type = field_type_of(name, spec)?;

    let mut builder = ConstraintBuilder::new(name, field_type);
    for (key, value) in spec {
        if key == "type" || ANNOTATION_KEYS.contains(&key.as_str()) {
            continue;
        }

        match (key.as_str(), field_type) {
            ("items", FieldType::List) => {
                let item_type = value
                    .as_object()
                    .filter(|items| items.len() == 1)
                    .and_then(|items| items.get("type"))
                    .ok_or_else(|| invalid(name, "'items' must be {type: <item type>}"))?;
                builder.apply("item_type", item_type)?;
            }
            ("required", FieldType::Object) => builder.apply("required_subkeys", value)?,
            _ => {
                let native = match key.as_str() {
                    "minLength" => "min_length",
                    "maxLength" => "max_length",
                    "minimum" => "min",
                    "maximum" => "max",
                    "minItems" => "min_items",
                    "maxItems" => "max_items",
                    "pattern" => "pattern",
                    _ => {
                        return Err(ContractError::UnknownConstraint {
                            field: name.to_string(),
                            field_type,
                            key: key.clone(),
                        })
                    }
                };
                builder.apply_as(key, native, value)?;
            }
        }
    }

    Ok(FieldSpec {
        name: name.to_string(),
        field_type,
        required,
        description: annotation(name, spec)?,
        constraints: builder.finish()?,
    })
}

/// Accumulates constraints for one field, rejecting keys that do not
/// belong to its type.
struct ConstraintBuilder<'a> {
    field: &'a str,
    field_type: FieldType,
    constraints: Constraints,
}

impl<'a> ConstraintBuilder<'a> {
    fn new(field: &'a str, field_type: FieldType) -> Self {
        Self {
            field,
            field_type,
            constraints: Constraints::empty_for(field_type),
        }
    }

    fn apply(&mut self, key: &str, value: &Value) -> Result<(), ContractError> {
        self.apply_as(key, key, value)
    }

    /// Apply `value` to the native constraint `native`; `key` is the name the
    /// author used and is what error messages report.
    fn apply_as(&mut self, key: &str, native: &str, value: &Value) -> Result<(), ContractError> {
        let field = self.field;
        match (&mut self.constraints, native) {
            (Constraints::String { min_length, .. }, "min_length") => {
                *min_length = Some(count(field, key, value)?)
            }
            (Constraints::String { max_length, .. }, "max_length") => {
                *max_length = Some(count(field, key, value)?)
            }
            (Constraints::String { pattern, .. }, "pattern") => {
                let source = value
                    .as_str()
                    .ok_or_else(|| invalid(field, format!("'{}' must be a string", key)))?;
                let compiled =
                    Pattern::new(source).map_err(|source| ContractError::InvalidPattern {
                        location: format!("field '{}'", field),
                        source,
                    })?;
                *pattern = Some(compiled);
            }
            (Constraints::Numeric { min, .. }, "min") => *min = Some(number(field, key, value)?),
            (Constraints::Numeric { max, .. }, "max") => *max = Some(number(field, key, value)?),
            (Constraints::List { min_items, .. }, "min_items") => {
                *min_items = Some(count(field, key, value)?)
            }
            (Constraints::List { max_items, .. }, "max_items") => {
                *max_items = Some(count(field, key, value)?)
            }
            (Constraints::List { item_type, .. }, "item_type") => {
                let name = value
                    .as_str()
                    .ok_or_else(|| invalid(field, format!("'{}' must be a type name", key)))?;
                let parsed = FieldType::parse(name).ok_or_else(|| ContractError::UnknownFieldType {
                    field: format!("{}[]", field),
                    field_type: name.to_string(),
                })?;
                *item_type = Some(parsed);
            }
            (Constraints::Object { required_subkeys }, "required_subkeys") => {
                *required_subkeys = string_list(Some(value)).ok_or_else(|| {
                    invalid(field, format!("'{}' must be a name or list of names", key))
                })?;
            }
            _ => {
                return Err(ContractError::UnknownConstraint {
                    field: field.to_string(),
                    field_type: self.field_type,
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Reject inverted bounds.
    fn finish(self) -> Result<Constraints, ContractError> {
        let inverted = match &self.constraints {
            Constraints::String {
                min_length: Some(lo),
                max_length: Some(hi),
                ..
            } => lo > hi,
            Constraints::List {
                min_items: Some(lo),
                max_items: Some(hi),
                ..
            } => lo > hi,
            Constraints::Numeric {
                min: Some(lo),
                max: Some(hi),
            } => compare_numbers(lo, hi) == Ordering::Greater,
            _ => false,
        };

        if inverted {
            return Err(invalid(self.field, "lower bound exceeds upper bound"));
        }
        Ok(self.constraints)
    }
}

/// Compare two JSON numbers, exactly for integers and as f64 otherwise.
pub(crate) fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a.cmp(&b);
    }
    let a = a.as_f64().unwrap_or(f64::NAN);
    let b = b.as_f64().unwrap_or(f64::NAN);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn field_mapping<'v>(name: &str, spec: &'v Value) -> Result<&'v Map<String, Value>, ContractError> {
    spec.as_object()
        .ok_or_else(|| invalid(name, "field spec must be a mapping"))
}

fn field_type_of(name: &str, spec: &Map<String, Value>) -> Result<FieldType, ContractError> {
    let type_name = spec
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(name, "missing 'type'"))?;

    FieldType::parse(type_name).ok_or_else(|| ContractError::UnknownFieldType {
        field: name.to_string(),
        field_type: type_name.to_string(),
    })
}

fn annotation(name: &str, spec: &Map<String, Value>) -> Result<Option<String>, ContractError> {
    match spec.get("description") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(name, "'description' must be a string")),
    }
}

fn count(field: &str, key: &str, value: &Value) -> Result<usize, ContractError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(field, format!("'{}' must be a non-negative integer", key)))
}

fn number(field: &str, key: &str, value: &Value) -> Result<Number, ContractError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(invalid(field, format!("'{}' must be a number", key))),
    }
}

/// A single string or a list of strings, normalized to a list.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::String(s)) => Some(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(String::from))
            .collect(),
        Some(_) => None,
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ContractError {
    ContractError::InvalidConstraint {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_string_field() {
        let fields = parse_fields(&json!({
            "title": {"type": "string", "required": true, "min_length": 10, "max_length": 80, "pattern": "^[A-Z]"}
        }))
        .unwrap();

        assert_eq!(fields.len(), 1);
        let title = &fields[0];
        assert!(title.required);
        assert_eq!(title.field_type, FieldType::String);
        match &title.constraints {
            Constraints::String {
                min_length,
                max_length,
                pattern,
            } => {
                assert_eq!(*min_length, Some(10));
                assert_eq!(*max_length, Some(80));
                assert_eq!(pattern.as_ref().unwrap().as_str(), "^[A-Z]");
            }
            other => panic!("unexpected constraints {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_type() {
        let result = parse_fields(&json!({"when": {"type": "datetime"}}));
        assert!(matches!(
            result,
            Err(ContractError::UnknownFieldType { ref field_type, .. }) if field_type == "datetime"
        ));
    }

    #[test]
    fn test_constraint_for_other_type_rejected() {
        let result = parse_fields(&json!({"price": {"type": "int", "min_length": 1}}));
        assert!(matches!(
            result,
            Err(ContractError::UnknownConstraint { ref key, field_type: FieldType::Int, .. }) if key == "min_length"
        ));
    }

    #[test]
    fn test_unknown_constraint_rejected() {
        let result = parse_fields(&json!({"title": {"type": "string", "max_words": 3}}));
        assert!(matches!(result, Err(ContractError::UnknownConstraint { .. })));
    }

    #[test]
    fn test_bool_accepts_no_constraints() {
        let result = parse_fields(&json!({"in_stock": {"type": "bool", "min": 0}}));
        assert!(matches!(result, Err(ContractError::UnknownConstraint { .. })));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = parse_fields(&json!({"price": {"type": "float", "min": 10, "max": 1.5}}));
        assert!(matches!(result, Err(ContractError::InvalidConstraint { .. })));
    }

    #[test]
    fn test_required_subkeys_single_value_normalized() {
        let fields = parse_fields(&json!({"meta": {"type": "object", "required_subkeys": "author"}})).unwrap();
        assert_eq!(
            fields[0].constraints,
            Constraints::Object {
                required_subkeys: vec!["author".to_string()]
            }
        );
    }

    #[test]
    fn test_json_schema_dialect() {
        let fields = parse_fields(&json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "pattern": "^[A-Z][a-z]+ [A-Z][a-z]+$"},
                "age": {"type": "integer", "minimum": 18, "maximum": 65},
                "tags": {"type": "array", "minItems": 1, "items": {"type": "string"}},
                "meta": {"type": "object", "required": ["source"]}
            },
            "required": ["name", "age"]
        }))
        .unwrap();

        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "tags", "meta"]);
        assert!(fields[0].required);
        assert!(fields[1].required);
        assert!(!fields[2].required);
        assert_eq!(fields[1].field_type, FieldType::Int);
        assert_eq!(
            fields[1].constraints,
            Constraints::Numeric {
                min: Some(18.into()),
                max: Some(65.into()),
            }
        );
        assert_eq!(
            fields[2].constraints,
            Constraints::List {
                min_items: Some(1),
                max_items: None,
                item_type: Some(FieldType::String),
            }
        );
        assert_eq!(
            fields[3].constraints,
            Constraints::Object {
                required_subkeys: vec!["source".to_string()]
            }
        );
    }

    #[test]
    fn test_json_schema_without_properties_is_empty() {
        let fields = parse_fields(&json!({"type": "object"})).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_json_schema_unknown_keyword_rejected() {
        let result = parse_fields(&json!({
            "type": "object",
            "properties": {"email": {"type": "string", "format": "email"}}
        }));
        assert!(matches!(
            result,
            Err(ContractError::UnknownConstraint { ref key, .. }) if key == "format"
        ));
    }

    #[test]
    fn test_int_accepts_only_integers() {
        assert!(FieldType::Int.accepts(&json!(3)));
        assert!(FieldType::Int.accepts(&json!(-3)));
        assert!(!FieldType::Int.accepts(&json!(3.0)));
        assert!(!FieldType::Int.accepts(&json!("3")));
        assert!(FieldType::Float.accepts(&json!(3)));
        assert!(!FieldType::String.accepts(&Value::Null));
    }

    #[test]
    fn test_compare_numbers() {
        assert_eq!(compare_numbers(&(-1).into(), &0.into()), Ordering::Less);
        let half = Number::from_f64(0.5).unwrap();
        assert_eq!(compare_numbers(&half, &0.into()), Ordering::Greater);
        assert_eq!(compare_numbers(&5u64.into(), &5i64.into()), Ordering::Equal);
    }
}
