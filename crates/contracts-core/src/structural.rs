//! Structural validation of a candidate object against field declarations.

use serde_json::{json, Map, Number, Value};
use std::cmp::Ordering;

use crate::contract::{compare_numbers, Constraints, FieldSpec, FieldType};
use crate::types::{json_type_name, Violation, ViolationKind, ROOT_IDENTIFIER};

/// Check a structured candidate against the declared fields.
///
/// Fields are visited in declaration order. A missing optional field is
/// skipped; a type mismatch stops further checks on that field; otherwise
/// every failed constraint is reported. Undeclared keys are ignored.
pub fn validate_structure(fields: &[FieldSpec], candidate: &Value) -> Vec<Violation> {
    let Some(object) = candidate.as_object() else {
        return vec![Violation::structural(
            ROOT_IDENTIFIER,
            ViolationKind::StructureRequired,
            format!(
                "Candidate must be an object, found {}",
                json_type_name(candidate)
            ),
            None,
        )];
    };

    let mut violations = Vec::new();
    for field in fields {
        check_field(field, object, &mut violations);
    }
    violations
}

fn check_field(field: &FieldSpec, object: &Map<String, Value>, out: &mut Vec<Violation>) {
    let name = field.name.as_str();

    let Some(value) = object.get(name) else {
        if field.required {
            out.push(Violation::structural(
                name,
                ViolationKind::RequiredFieldMissing,
                format!("Required field '{}' is missing", name),
                None,
            ));
        }
        return;
    };

    if !field.field_type.accepts(value) {
        out.push(type_mismatch(name, field.field_type, value));
        return;
    }

    match (&field.constraints, value) {
        (
            Constraints::String {
                min_length,
                max_length,
                pattern,
            },
            Value::String(s),
        ) => {
            let length = s.chars().count();
            if let Some(min) = *min_length {
                if length < min {
                    out.push(Violation::structural(
                        name,
                        ViolationKind::MinLength,
                        format!("Field '{}' is {} characters, below minimum {}", name, length, min),
                        Some(json!({ "min_length": min, "actual": length })),
                    ));
                }
            }
            if let Some(max) = *max_length {
                if length > max {
                    out.push(Violation::structural(
                        name,
                        ViolationKind::MaxLength,
                        format!("Field '{}' is {} characters, above maximum {}", name, length, max),
                        Some(json!({ "max_length": max, "actual": length })),
                    ));
                }
            }
            if let Some(pattern) = pattern {
                if !pattern.is_match(s) {
                    out.push(Violation::structural(
                        name,
                        ViolationKind::PatternMismatch,
                        format!("Field '{}' does not match pattern '{}'", name, pattern.as_str()),
                        Some(json!({ "pattern": pattern.as_str() })),
                    ));
                }
            }
        }

        (Constraints::Numeric { min, max }, Value::Number(n)) => {
            if let Some(min) = min {
                if compare_numbers(n, min) == Ordering::Less {
                    out.push(bound_violation(name, ViolationKind::Minimum, "min", min, n));
                }
            }
            if let Some(max) = max {
                if compare_numbers(n, max) == Ordering::Greater {
                    out.push(bound_violation(name, ViolationKind::Maximum, "max", max, n));
                }
            }
        }

        (
            Constraints::List {
                min_items,
                max_items,
                item_type,
            },
            Value::Array(items),
        ) => {
            let count = items.len();
            if let Some(min) = *min_items {
                if count < min {
                    out.push(Violation::structural(
                        name,
                        ViolationKind::MinItems,
                        format!("Field '{}' has {} item(s), below minimum {}", name, count, min),
                        Some(json!({ "min_items": min, "actual": count })),
                    ));
                }
            }
            if let Some(max) = *max_items {
                if count > max {
                    out.push(Violation::structural(
                        name,
                        ViolationKind::MaxItems,
                        format!("Field '{}' has {} item(s), above maximum {}", name, count, max),
                        Some(json!({ "max_items": max, "actual": count })),
                    ));
                }
            }
            if let Some(item_type) = item_type {
                for (index, item) in items.iter().enumerate() {
                    if !item_type.accepts(item) {
                        out.push(Violation::structural(
                            format!("{}[{}]", name, index),
                            ViolationKind::ItemTypeMismatch,
                            format!(
                                "Item {} of '{}' should be {}, found {}",
                                index,
                                name,
                                item_type,
                                json_type_name(item)
                            ),
                            Some(json!({
                                "index": index,
                                "expected": item_type,
                                "actual": json_type_name(item),
                            })),
                        ));
                    }
                }
            }
        }

        (Constraints::Object { required_subkeys }, Value::Object(inner)) => {
            for key in required_subkeys.iter().filter(|k| !inner.contains_key(k.as_str())) {
                out.push(Violation::structural(
                    format!("{}.{}", name, key),
                    ViolationKind::RequiredSubkeyMissing,
                    format!("Field '{}' is missing required key '{}'", name, key),
                    Some(json!({ "subkey": key })),
                ));
            }
        }

        _ => {}
    }
}

fn type_mismatch(name: &str, expected: FieldType, value: &Value) -> Violation {
    let actual = json_type_name(value);
    Violation::structural(
        name,
        ViolationKind::TypeMismatch,
        format!("Field '{}' should be {}, found {}", name, expected, actual),
        Some(json!({ "expected": expected, "actual": actual })),
    )
}

fn bound_violation(
    name: &str,
    kind: ViolationKind,
    bound_key: &str,
    bound: &Number,
    actual: &Number,
) -> Violation {
    let relation = match kind {
        ViolationKind::Minimum => "below minimum",
        _ => "above maximum",
    };
    let mut details = Map::new();
    details.insert(bound_key.to_string(), Value::Number(bound.clone()));
    details.insert("actual".to_string(), Value::Number(actual.clone()));

    Violation::structural(
        name,
        kind,
        format!("Field '{}' is {}, {} {}", name, actual, relation, bound),
        Some(Value::Object(details)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Contract;

    fn fields(yaml: &str) -> Vec<FieldSpec> {
        Contract::from_yaml(yaml).unwrap().fields
    }

    #[test]
    fn test_negative_price_yields_one_violation() {
        let fields = fields("schema:\n  price: { type: int, min: 0 }\n");
        let violations = validate_structure(&fields, &json!({ "price": -1 }));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Minimum);
        assert_eq!(violations[0].identifier, "price");
        assert_eq!(violations[0].details, Some(json!({ "min": 0, "actual": -1 })));
    }

    #[test]
    fn test_missing_fields() {
        let fields = fields(
            r#"
schema:
  title: { type: string, required: true }
  subtitle: { type: string, min_length: 100 }
"#,
        );
        let violations = validate_structure(&fields, &json!({}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::RequiredFieldMissing);
        assert_eq!(violations[0].identifier, "title");
    }

    #[test]
    fn test_type_mismatch_skips_constraints() {
        let fields = fields("schema:\n  title: { type: string, min_length: 10, pattern: '^A' }\n");
        let violations = validate_structure(&fields, &json!({ "title": 42 }));
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].details,
            Some(json!({ "expected": "string", "actual": "int" }))
        );
    }

    #[test]
    fn test_null_is_a_type_mismatch() {
        let fields = fields("schema:\n  title: { type: string, required: true }\n");
        let violations = validate_structure(&fields, &json!({ "title": null }));
        assert_eq!(violations[0].kind, ViolationKind::TypeMismatch);
    }

    #[test]
    fn test_int_rejects_fractional_numbers() {
        let fields = fields("schema:\n  count: { type: int }\n  ratio: { type: float }\n");
        let violations = validate_structure(&fields, &json!({ "count": 3.0, "ratio": 3 }));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].identifier, "count");
    }

    #[test]
    fn test_string_constraints_all_reported() {
        let fields = fields(
            "schema:\n  code: { type: string, min_length: 5, pattern: '^[A-Z]+$' }\n",
        );
        let violations = validate_structure(&fields, &json!({ "code": "ab" }));
        let kinds: Vec<_> = violations.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::MinLength, ViolationKind::PatternMismatch]);
    }

    #[test]
    fn test_length_counts_characters() {
        let fields = fields("schema:\n  name: { type: string, max_length: 4 }\n");
        assert!(validate_structure(&fields, &json!({ "name": "café" })).is_empty());
    }

    #[test]
    fn test_pattern_is_search_and_case_sensitive() {
        let fields = fields("schema:\n  sku: { type: string, pattern: 'X-\\d+' }\n");
        assert!(validate_structure(&fields, &json!({ "sku": "item X-12 blue" })).is_empty());
        assert_eq!(validate_structure(&fields, &json!({ "sku": "x-12" })).len(), 1);
    }

    #[test]
    fn test_list_item_types() {
        let fields = fields(
            "schema:\n  tags: { type: list, min_items: 1, max_items: 3, item_type: string }\n",
        );
        let violations = validate_structure(&fields, &json!({ "tags": ["a", 2, "c", true] }));
        let ids: Vec<_> = violations.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(ids, vec!["tags", "tags[1]", "tags[3]"]);
        assert_eq!(violations[0].kind, ViolationKind::MaxItems);
        assert_eq!(violations[1].details.as_ref().unwrap()["index"], json!(1));
    }

    #[test]
    fn test_required_subkeys() {
        let fields = fields(
            "schema:\n  seller: { type: object, required_subkeys: [name, email, phone] }\n",
        );
        let violations = validate_structure(&fields, &json!({ "seller": { "name": "A" } }));
        let ids: Vec<_> = violations.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(ids, vec!["seller.email", "seller.phone"]);
    }

    #[test]
    fn test_undeclared_fields_ignored() {
        let fields = fields("schema:\n  title: { type: string }\n");
        assert!(validate_structure(&fields, &json!({ "title": "x", "extra": [1, 2] })).is_empty());
    }

    #[test]
    fn test_fields_reported_in_declaration_order() {
        let fields = fields(
            r#"
schema:
  zeta: { type: int, required: true }
  alpha: { type: int, required: true }
"#,
        );
        let violations = validate_structure(&fields, &json!({}));
        let ids: Vec<_> = violations.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }
}
