//! # contracts-core
//!
//! Deterministic validation of LLM output against declarative contracts.
//!
//! A contract declares structural fields (types and constraints on a JSON
//! object) and content rules (keywords, counts, patterns, phrase order and
//! proximity, style heuristics). Validation checks a candidate against both
//! and reports every failure.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same contract and candidate, same result
//! 2. **Exhaustive**: every failing field constraint and rule is reported
//! 3. **Ordered**: structural violations in field order, then rule violations in rule order
//! 4. **Load-time strictness**: malformed contracts fail to load; `validate` never errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use contracts_core::{render, validate, Candidate, Contract, ReportFormat};
//!
//! let contract = Contract::from_yaml_file("product.yaml")?;
//! let candidate = Candidate::text(std::fs::read_to_string("output.json")?);
//! let result = validate(&contract, &candidate);
//!
//! if !result.is_valid {
//!     println!("{}", render(&result, ReportFormat::Markdown));
//! }
//! ```

pub mod contract;
pub mod report;
pub mod rules;
pub mod structural;
pub mod types;
pub mod validator;

// Re-export main types at crate root
pub use contract::{
    Constraints, Contract, ContractError, FieldSpec, FieldType, Pattern, RuleKind, RuleSpec,
};
pub use report::{render, Report, ReportFormat};
pub use rules::{evaluate_rule, evaluate_rules, RuleContext};
pub use structural::validate_structure;
pub use types::{
    Candidate, StructuralInterpretationError, ValidationResult, Violation, ViolationKind,
    ViolationSource, ROOT_IDENTIFIER,
};
pub use validator::{structural_phase, validate, StructuralPhase};
