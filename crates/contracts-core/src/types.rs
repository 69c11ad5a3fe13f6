//! Core types for contract validation.
//!
//! These are the data structures that flow between the orchestrator,
//! the structural validator, the rule evaluators and the report generator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Identifier used for violations that concern the candidate as a whole.
pub const ROOT_IDENTIFIER: &str = "$";

/// The artifact under test.
///
/// A candidate always has a textual form, which is what the rule evaluators
/// see. It may also carry a structured form, which is what the structural
/// validator sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Textual form of the candidate
    pub text: String,

    /// Structured form, if the caller already has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
}

impl Candidate {
    /// Create a text-only candidate.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }

    /// Create a candidate from structured data.
    ///
    /// The textual form is the compact JSON serialization of the value, which
    /// is deterministic for a given value.
    pub fn structured(value: Value) -> Self {
        Self {
            text: value.to_string(),
            structured: Some(value),
        }
    }

    /// Create a candidate with both a caller-supplied text and structured form.
    pub fn with_structured(text: impl Into<String>, value: Value) -> Self {
        Self {
            text: text.into(),
            structured: Some(value),
        }
    }

    /// Interpret the candidate as a JSON object.
    ///
    /// Uses the supplied structured form when present, otherwise parses the
    /// text as JSON.
    pub fn interpret(&self) -> Result<Value, StructuralInterpretationError> {
        let value = match &self.structured {
            Some(value) => value.clone(),
            None => serde_json::from_str(self.text.trim())?,
        };

        if value.is_object() {
            Ok(value)
        } else {
            Err(StructuralInterpretationError::NotAnObject(
                json_type_name(&value).to_string(),
            ))
        }
    }
}

/// The candidate could not be read as structured data.
///
/// This never escapes `validate`; it is reported as a `structure_required`
/// violation and rule evaluation continues against the raw text.
#[derive(Error, Debug)]
pub enum StructuralInterpretationError {
    #[error("candidate is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("candidate is JSON but not an object (found {0})")]
    NotAnObject(String),
}

/// Where a violation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSource {
    Structural,
    Rule,
}

impl ViolationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationSource::Structural => "structural",
            ViolationSource::Rule => "rule",
        }
    }
}

/// Machine-readable classification of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    RequiredFieldMissing,
    TypeMismatch,
    MinLength,
    MaxLength,
    PatternMismatch,
    Minimum,
    Maximum,
    MinItems,
    MaxItems,
    ItemTypeMismatch,
    RequiredSubkeyMissing,
    StructureRequired,
    RuleFailed,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::RequiredFieldMissing => "required_field_missing",
            ViolationKind::TypeMismatch => "type_mismatch",
            ViolationKind::MinLength => "min_length",
            ViolationKind::MaxLength => "max_length",
            ViolationKind::PatternMismatch => "pattern_mismatch",
            ViolationKind::Minimum => "minimum",
            ViolationKind::Maximum => "maximum",
            ViolationKind::MinItems => "min_items",
            ViolationKind::MaxItems => "max_items",
            ViolationKind::ItemTypeMismatch => "item_type_mismatch",
            ViolationKind::RequiredSubkeyMissing => "required_subkey_missing",
            ViolationKind::StructureRequired => "structure_required",
            ViolationKind::RuleFailed => "rule_failed",
        }
    }
}

/// A single reported failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Structural check or content rule
    pub source: ViolationSource,

    /// Field name (structural) or rule kind (rule)
    pub identifier: String,

    /// What kind of failure this is
    pub kind: ViolationKind,

    /// Human-readable explanation
    pub message: String,

    /// Structured data explaining the failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Violation {
    /// Build a structural violation.
    pub fn structural(
        identifier: impl Into<String>,
        kind: ViolationKind,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            source: ViolationSource::Structural,
            identifier: identifier.into(),
            kind,
            message: message.into(),
            details,
        }
    }

    /// Build a rule violation.
    pub fn rule(identifier: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self {
            source: ViolationSource::Rule,
            identifier: identifier.into(),
            kind: ViolationKind::RuleFailed,
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Outcome of validating one candidate against one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff `violations` is empty
    pub is_valid: bool,

    /// Structural violations first (field order), then rule violations (rule order)
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    /// Build a result; validity is derived from the violation list.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
        }
    }

    pub fn structural_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.source == ViolationSource::Structural)
    }

    pub fn rule_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.source == ViolationSource::Rule)
    }
}

/// JSON type name used in messages and details.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
