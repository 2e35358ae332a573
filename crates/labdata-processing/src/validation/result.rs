use crate::types::RowId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingColumn,
    MissingValues,
    DuplicateValues,
    InvalidFormat,
    InvalidValues,
    NonNumeric,
    BelowMinimum,
    AboveMaximum,
    InvalidDates,
    FutureDates,
    EmptyValues,
    TooShort,
    /// A check could not run; reported as a warning.
    FormatCheckFailed,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingColumn => "missing_column",
            Self::MissingValues => "missing_values",
            Self::DuplicateValues => "duplicate_values",
            Self::InvalidFormat => "invalid_format",
            Self::InvalidValues => "invalid_values",
            Self::NonNumeric => "non_numeric",
            Self::BelowMinimum => "below_minimum",
            Self::AboveMaximum => "above_maximum",
            Self::InvalidDates => "invalid_dates",
            Self::FutureDates => "future_dates",
            Self::EmptyValues => "empty_values",
            Self::TooShort => "too_short",
            Self::FormatCheckFailed => "format_check_failed",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row-level (or column-level) violation in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub column: String,
    /// Affected rows, in dataset order.
    pub rows: Vec<RowId>,
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_errors: usize,
    pub total_warnings: usize,
}

/// Structural stats for a validated column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValidationStats {
    pub total_rows: usize,
    pub null_count: usize,
    /// Distinct non-null values.
    pub unique_count: usize,
}

/// Outcome of a validation run. Errors block export; warnings are advisory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub summary: ValidationSummary,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub column_stats: BTreeMap<String, ColumnValidationStats>,
}

impl ValidationResult {
    pub(crate) fn push_error(&mut self, finding: Finding) {
        self.summary.total_errors += 1;
        self.errors.push(finding);
    }

    pub(crate) fn push_warning(&mut self, finding: Finding) {
        self.summary.total_warnings += 1;
        self.warnings.push(finding);
    }

    pub fn has_blocking_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_blocking_errors()
    }

    /// Errors of one kind, in the order they were found.
    pub fn errors_of(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.errors.iter().filter(move |f| f.kind == kind)
    }

    /// Every finding (errors then warnings) for `column`.
    pub fn findings_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |f| f.column == column)
    }

    /// Rows referenced by any error, for cell highlighting on export.
    pub fn error_rows(&self) -> BTreeSet<RowId> {
        self.errors
            .iter()
            .flat_map(|f| f.rows.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(kind: FindingKind, column: &str, rows: &[u64]) -> Finding {
        Finding {
            kind,
            column: column.to_string(),
            rows: rows.iter().map(|&r| RowId(r)).collect(),
            count: rows.len(),
            message: String::new(),
        }
    }

    #[test]
    fn test_blocking_errors() {
        let mut result = ValidationResult::default();
        assert!(result.is_valid());

        result.push_warning(finding(FindingKind::FormatCheckFailed, "Patient_ID", &[]));
        assert!(result.is_valid());
        assert_eq!(result.summary.total_warnings, 1);

        result.push_error(finding(FindingKind::InvalidValues, "Gender", &[3]));
        assert!(result.has_blocking_errors());
        assert_eq!(result.summary.total_errors, 1);
    }

    #[test]
    fn test_error_rows_and_lookup() {
        let mut result = ValidationResult::default();
        result.push_error(finding(FindingKind::DuplicateValues, "Patient_ID", &[0, 4]));
        result.push_error(finding(FindingKind::AboveMaximum, "Age", &[4, 2]));

        let rows: Vec<RowId> = result.error_rows().into_iter().collect();
        assert_eq!(rows, vec![RowId(0), RowId(2), RowId(4)]);
        assert_eq!(result.errors_of(FindingKind::AboveMaximum).count(), 1);
        assert_eq!(result.findings_for("Patient_ID").count(), 1);
    }

    #[test]
    fn test_finding_serializes_type_key() {
        let json = serde_json::to_value(finding(FindingKind::NonNumeric, "Age", &[1])).unwrap();
        assert_eq!(json["type"], "non_numeric");
        assert_eq!(json["rows"], serde_json::json!([1]));
    }
}
