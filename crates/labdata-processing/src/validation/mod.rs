//! Declarative field validation.
//!
//! A [`RuleSet`] lists per-field [`Constraint`]s; the [`Validator`] runs them
//! and reports row-referenced findings. Any error blocks export, warnings
//! are advisory.

mod result;
mod rules;
mod validator;

pub use result::{ColumnValidationStats, Finding, FindingKind, ValidationResult, ValidationSummary};
pub use rules::{Constraint, FieldRule, RuleSet};
pub use validator::Validator;
