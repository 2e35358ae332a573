//! Schema analysis for incoming datasets.
//!
//! The analyzer classifies every column into one of the [`ValueType`]s,
//! counts missing and distinct values, and draws a small deterministic sample
//! of example values for display.
//!
//! [`ValueType`]: crate::types::ValueType

mod analyzer;

pub use analyzer::SchemaAnalyzer;
