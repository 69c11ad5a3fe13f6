//! Contract parsing and normalization.
//!
//! A contract is a field schema plus an ordered rule list. This module
//! loads contracts from YAML/JSON, resolves rule bundles, compiles every
//! regex eagerly and rejects anything it does not understand.

mod fields;
mod parser;
mod pattern;
mod rules;

pub use fields::{Constraints, FieldSpec, FieldType};
pub(crate) use fields::compare_numbers;
pub use parser::{Contract, ContractError, MAX_INCLUDE_DEPTH};
pub use pattern::Pattern;
pub use rules::{RuleKind, RuleSpec, DEFAULT_PROXIMITY_DISTANCE};
