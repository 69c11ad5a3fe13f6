//! Validation orchestrator.
//!
//! Structural phase first, then every rule in contract order. Nothing
//! short-circuits: the report lists every failure, not just the first.

use serde_json::Value;

use crate::contract::Contract;
use crate::rules::{evaluate_rules, RuleContext};
use crate::structural::validate_structure;
use crate::types::{Candidate, ValidationResult, Violation, ViolationKind, ROOT_IDENTIFIER};

/// Outcome of interpreting a candidate and checking its declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralPhase {
    /// Structural violations in field-declaration order
    pub violations: Vec<Violation>,

    /// The candidate as a JSON object, when it could be read as one
    pub structured: Option<Value>,
}

/// Interpret the candidate and run the structural validator.
///
/// Interpretation is always attempted so list-count rules can use the
/// structured form. Failing to interpret only matters when the contract
/// declares fields, in which case it becomes a single `structure_required`
/// violation.
pub fn structural_phase(contract: &Contract, candidate: &Candidate) -> StructuralPhase {
    match candidate.interpret() {
        Ok(value) => {
            let violations = if contract.has_fields() {
                validate_structure(&contract.fields, &value)
            } else {
                Vec::new()
            };
            StructuralPhase {
                violations,
                structured: Some(value),
            }
        }
        Err(err) => {
            let violations = if contract.has_fields() {
                tracing::debug!(error = %err, "candidate is not structured");
                vec![Violation::structural(
                    ROOT_IDENTIFIER,
                    ViolationKind::StructureRequired,
                    format!("Contract declares fields but {}", err),
                    None,
                )]
            } else {
                Vec::new()
            };
            StructuralPhase {
                violations,
                structured: None,
            }
        }
    }
}

/// Validate a candidate against a contract.
///
/// Never fails: every problem with the candidate is a violation. Calling
/// this twice with the same inputs gives equal results.
pub fn validate(contract: &Contract, candidate: &Candidate) -> ValidationResult {
    let phase = structural_phase(contract, candidate);

    let ctx = RuleContext::new(&candidate.text, phase.structured.as_ref(), &contract.fields);
    let rule_violations = evaluate_rules(&contract.rules, &ctx);

    let mut violations = phase.violations;
    violations.extend(rule_violations);

    let result = ValidationResult::from_violations(violations);
    tracing::debug!(
        contract = contract.name.as_deref().unwrap_or("<unnamed>"),
        fields = contract.fields.len(),
        rules = contract.rules.len(),
        violations = result.violations.len(),
        "validated candidate"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ViolationSource;
    use serde_json::json;

    #[test]
    fn test_structure_required_when_text_is_not_json() {
        let contract = Contract::from_yaml(
            r#"
schema:
  title: { type: string, required: true }
rules:
  - keyword_must_include: hello
"#,
        )
        .unwrap();
        let result = validate(&contract, &Candidate::text("plain prose"));

        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.violations[0].identifier, ROOT_IDENTIFIER);
        assert_eq!(result.violations[0].kind, ViolationKind::StructureRequired);
        assert_eq!(result.violations[1].source, ViolationSource::Rule);
    }

    #[test]
    fn test_json_array_is_not_structured() {
        let contract = Contract::from_yaml("schema:\n  title: { type: string }\n").unwrap();
        let result = validate(&contract, &Candidate::text("[1, 2]"));
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].kind, ViolationKind::StructureRequired);
    }

    #[test]
    fn test_text_without_fields_needs_no_structure() {
        let contract = Contract::from_yaml("rules:\n  - word_count_min: 1\n").unwrap();
        let result = validate(&contract, &Candidate::text("not json at all"));
        assert!(result.is_valid);
    }

    #[test]
    fn test_json_text_is_interpreted() {
        let contract = Contract::from_yaml("schema:\n  price: { type: int, min: 0 }\n").unwrap();
        let result = validate(&contract, &Candidate::text(r#"  {"price": 5}  "#));
        assert!(result.is_valid);
    }

    #[test]
    fn test_structural_before_rule_violations() {
        let contract = Contract::from_yaml(
            r#"
rules:
  - keyword_must_include: warranty
schema:
  price: { type: int, min: 0 }
"#,
        )
        .unwrap();
        let candidate = Candidate::structured(json!({ "price": -5 }));
        let result = validate(&contract, &candidate);

        let sources: Vec<_> = result.violations.iter().map(|v| v.source).collect();
        assert_eq!(sources, vec![ViolationSource::Structural, ViolationSource::Rule]);
    }

    #[test]
    fn test_list_rule_sees_structured_candidate() {
        let contract = Contract::from_yaml(
            r#"
schema:
  features: { type: list }
rules:
  - min_list_items: 3
"#,
        )
        .unwrap();
        let candidate = Candidate::structured(json!({ "features": ["a", "b"] }));
        let result = validate(&contract, &candidate);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].identifier, "min_list_items");
    }
}
