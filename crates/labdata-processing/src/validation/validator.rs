use super::result::{ColumnValidationStats, Finding, FindingKind, ValidationResult};
use super::rules::{Constraint, FieldRule, RuleSet};
use crate::error::{Result, ResultExt};
use crate::profiler::{date_values, numeric_values, text_values};
use crate::types::Dataset;
use crate::utils::char_len;
use chrono::{Local, NaiveDateTime};
use polars::prelude::*;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Evaluates a [`RuleSet`] against a dataset.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    reference_time: Option<NaiveDateTime>,
}

/// Per-column values, extracted once and shared by every check.
struct ColumnView<'a> {
    name: &'a str,
    column: &'a Column,
    texts: Vec<Option<String>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix "now" for future-date checks. Defaults to the local clock.
    pub fn with_reference_time(mut self, reference_time: NaiveDateTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    /// Run every rule against `dataset`.
    ///
    /// Checks are independent: one column may yield several findings of
    /// different kinds, and a failing check never stops the others.
    pub fn validate(&self, dataset: &Dataset, rules: &RuleSet) -> Result<ValidationResult> {
        let now = self
            .reference_time
            .unwrap_or_else(|| Local::now().naive_local());
        let mut result = ValidationResult::default();

        info!(
            "Validating {} rows against {} field rules",
            dataset.height(),
            rules.len()
        );

        for rule in rules.iter() {
            if !dataset.has_column(&rule.field) {
                if rule.is_required() {
                    result.push_error(Finding {
                        kind: FindingKind::MissingColumn,
                        column: rule.field.clone(),
                        rows: Vec::new(),
                        count: 0,
                        message: format!("Required column '{}' is missing", rule.field),
                    });
                } else {
                    debug!("Optional column '{}' not present, skipping", rule.field);
                }
                continue;
            }

            self.validate_field(dataset, rule, now, &mut result)
                .context(format!("Validating column '{}'", rule.field))?;
        }

        info!(
            "Validation finished: {} errors, {} warnings",
            result.summary.total_errors, result.summary.total_warnings
        );
        Ok(result)
    }

    fn validate_field(
        &self,
        dataset: &Dataset,
        rule: &FieldRule,
        now: NaiveDateTime,
        result: &mut ValidationResult,
    ) -> Result<()> {
        let column = dataset.column(&rule.field)?;
        let view = ColumnView {
            name: &rule.field,
            column,
            texts: text_values(column)?,
        };

        result.column_stats.insert(
            rule.field.clone(),
            ColumnValidationStats {
                total_rows: column.len(),
                null_count: column.null_count(),
                unique_count: column.drop_nulls().n_unique()?,
            },
        );

        for constraint in &rule.constraints {
            match constraint {
                Constraint::Required => {
                    let rows = positions(&view.texts, |v| v.is_none());
                    push_rows(result, dataset, &view, FindingKind::MissingValues, rows, |n, c| {
                        format!("Found {} missing values in required column '{}'", n, c)
                    });
                }
                Constraint::Unique => check_unique(result, dataset, &view),
                Constraint::Pattern(pattern) => check_pattern(result, dataset, &view, pattern),
                Constraint::AllowedValues(allowed) => {
                    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
                    let rows = positions(&view.texts, |v| {
                        v.is_some_and(|s| !allowed.contains(s))
                    });
                    push_rows(result, dataset, &view, FindingKind::InvalidValues, rows, |n, c| {
                        format!("Found {} invalid values in column '{}'", n, c)
                    });
                }
                Constraint::NumericRange { min, max } => {
                    check_numeric(result, dataset, &view, *min, *max)?
                }
                Constraint::Date { not_future } => {
                    check_dates(result, dataset, &view, *not_future, now)?
                }
                Constraint::NonEmpty => {
                    let rows = positions(&view.texts, |v| v.is_none_or(|s| s.trim().is_empty()));
                    push_rows(result, dataset, &view, FindingKind::EmptyValues, rows, |n, c| {
                        format!("Found {} empty values in column '{}'", n, c)
                    });
                }
                Constraint::MinLength(min) => {
                    let rows = positions(&view.texts, |v| v.is_some_and(|s| char_len(s) < *min));
                    push_rows(result, dataset, &view, FindingKind::TooShort, rows, |n, c| {
                        format!("Found {} values shorter than {} characters in column '{}'", n, min, c)
                    });
                }
            }
        }

        Ok(())
    }
}

/// Positions whose value satisfies `predicate`.
fn positions<F>(texts: &[Option<String>], predicate: F) -> Vec<usize>
where
    F: Fn(Option<&str>) -> bool,
{
    texts
        .iter()
        .enumerate()
        .filter(|(_, v)| predicate(v.as_deref()))
        .map(|(i, _)| i)
        .collect()
}

/// Record an error covering `rows` unless it is empty.
fn push_rows<M>(
    result: &mut ValidationResult,
    dataset: &Dataset,
    view: &ColumnView<'_>,
    kind: FindingKind,
    rows: Vec<usize>,
    message: M,
) where
    M: FnOnce(usize, &str) -> String,
{
    if rows.is_empty() {
        return;
    }
    let count = rows.len();
    result.push_error(Finding {
        kind,
        column: view.name.to_string(),
        rows: dataset.row_ids_at(&rows),
        count,
        message: message(count, view.name),
    });
}

/// Every occurrence of a repeated value is listed; the count excludes the
/// first occurrence of each value.
fn check_unique(result: &mut ValidationResult, dataset: &Dataset, view: &ColumnView<'_>) {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for value in view.texts.iter().flatten() {
        *occurrences.entry(value.as_str()).or_default() += 1;
    }

    let rows = positions(&view.texts, |v| {
        v.is_some_and(|s| occurrences.get(s).is_some_and(|&n| n > 1))
    });
    if rows.is_empty() {
        return;
    }

    let count: usize = occurrences.values().filter(|&&n| n > 1).map(|n| n - 1).sum();
    result.push_error(Finding {
        kind: FindingKind::DuplicateValues,
        column: view.name.to_string(),
        rows: dataset.row_ids_at(&rows),
        count,
        message: format!("Found {} duplicate values in column '{}'", count, view.name),
    });
}

fn check_pattern(
    result: &mut ValidationResult,
    dataset: &Dataset,
    view: &ColumnView<'_>,
    pattern: &str,
) {
    // Matches at the start of the value, like an anchored search.
    let regex = match Regex::new(&format!("^(?:{})", pattern)) {
        Ok(regex) => regex,
        Err(e) => {
            warn!("Format check skipped for column '{}': {}", view.name, e);
            result.push_warning(Finding {
                kind: FindingKind::FormatCheckFailed,
                column: view.name.to_string(),
                rows: Vec::new(),
                count: 0,
                message: format!("Could not validate format for column '{}': {}", view.name, e),
            });
            return;
        }
    };

    let rows = positions(&view.texts, |v| v.is_some_and(|s| !regex.is_match(s)));
    push_rows(result, dataset, view, FindingKind::InvalidFormat, rows, |n, c| {
        format!("Found {} values with invalid format in column '{}'", n, c)
    });
}

fn check_numeric(
    result: &mut ValidationResult,
    dataset: &Dataset,
    view: &ColumnView<'_>,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<()> {
    let numbers = numeric_values(view.column)?;

    let non_numeric: Vec<usize> = view
        .texts
        .iter()
        .zip(&numbers)
        .enumerate()
        .filter(|(_, (text, number))| text.is_some() && number.is_none())
        .map(|(i, _)| i)
        .collect();
    push_rows(result, dataset, view, FindingKind::NonNumeric, non_numeric, |n, c| {
        format!("Found {} non-numeric values in column '{}'", n, c)
    });

    if let Some(min) = min {
        let below = numeric_positions(&numbers, |x| x < min);
        push_rows(result, dataset, view, FindingKind::BelowMinimum, below, |n, c| {
            format!("Found {} values below minimum in column '{}'", n, c)
        });
    }
    if let Some(max) = max {
        let above = numeric_positions(&numbers, |x| x > max);
        push_rows(result, dataset, view, FindingKind::AboveMaximum, above, |n, c| {
            format!("Found {} values above maximum in column '{}'", n, c)
        });
    }
    Ok(())
}

fn numeric_positions<F: Fn(f64) -> bool>(numbers: &[Option<f64>], predicate: F) -> Vec<usize> {
    numbers
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_some_and(&predicate))
        .map(|(i, _)| i)
        .collect()
}

fn check_dates(
    result: &mut ValidationResult,
    dataset: &Dataset,
    view: &ColumnView<'_>,
    not_future: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let dates = date_values(view.column)?;

    let invalid: Vec<usize> = view
        .texts
        .iter()
        .zip(&dates)
        .enumerate()
        .filter(|(_, (text, date))| text.is_some() && date.is_none())
        .map(|(i, _)| i)
        .collect();
    push_rows(result, dataset, view, FindingKind::InvalidDates, invalid, |n, c| {
        format!("Found {} invalid dates in column '{}'", n, c)
    });

    if not_future {
        let future: Vec<usize> = dates
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_some_and(|d| d > now))
            .map(|(i, _)| i)
            .collect();
        push_rows(result, dataset, view, FindingKind::FutureDates, future, |n, c| {
            format!("Found {} future dates in column '{}'", n, c)
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowId;
    use chrono::NaiveDate;

    fn reference_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn validator() -> Validator {
        Validator::new().with_reference_time(reference_time())
    }

    fn dataset(frame: DataFrame) -> Dataset {
        Dataset::from_dataframe(frame).unwrap()
    }

    fn ids(values: &[u64]) -> Vec<RowId> {
        values.iter().map(|&v| RowId(v)).collect()
    }

    #[test]
    fn test_missing_required_columns() {
        let ds = dataset(df! { "Age" => [30i64] }.unwrap());
        let result = validator()
            .validate(&ds, &RuleSet::surveillance_defaults())
            .unwrap();

        let missing: Vec<&str> = result
            .errors_of(FindingKind::MissingColumn)
            .map(|f| f.column.as_str())
            .collect();
        assert_eq!(
            missing,
            vec!["Patient_ID", "Gender", "Date_of_Admission", "Specimen_Type", "Organism"]
        );
        assert_eq!(result.summary.total_errors, 5);
        assert!(result.column_stats.contains_key("Age"));
    }

    #[test]
    fn test_optional_absent_field_is_skipped() {
        let ds = dataset(df! { "x" => [1i64] }.unwrap());
        let rules = RuleSet::new().field("Ward", vec![Constraint::NonEmpty]);
        let result = validator().validate(&ds, &rules).unwrap();
        assert!(result.is_valid());
        assert!(result.column_stats.is_empty());
    }

    #[test]
    fn test_missing_values_rows() {
        let ds = dataset(df! { "Organism" => [Some("E. coli"), None, Some("  ")] }.unwrap());
        let rules = RuleSet::new().field("Organism", vec![Constraint::Required, Constraint::NonEmpty]);
        let result = validator().validate(&ds, &rules).unwrap();

        let missing = result.errors_of(FindingKind::MissingValues).next().unwrap();
        assert_eq!(missing.rows, ids(&[1]));
        let empty = result.errors_of(FindingKind::EmptyValues).next().unwrap();
        assert_eq!(empty.rows, ids(&[1, 2]));
        assert_eq!(result.summary.total_errors, 2);
    }

    #[test]
    fn test_duplicate_values_lists_all_occurrences() {
        let ds = dataset(df! { "Patient_ID" => ["P1", "P2", "P1", "P1", "P3"] }.unwrap());
        let rules = RuleSet::new().field("Patient_ID", vec![Constraint::Unique]);
        let result = validator().validate(&ds, &rules).unwrap();

        assert_eq!(result.errors.len(), 1);
        let dup = &result.errors[0];
        assert_eq!(dup.kind, FindingKind::DuplicateValues);
        assert_eq!(dup.rows, ids(&[0, 2, 3]));
        assert_eq!(dup.count, 2);
    }

    #[test]
    fn test_unique_ignores_nulls() {
        let ds = dataset(df! { "Patient_ID" => [None::<&str>, None, Some("P1")] }.unwrap());
        let rules = RuleSet::new().field("Patient_ID", vec![Constraint::Unique]);
        assert!(validator().validate(&ds, &rules).unwrap().is_valid());
    }

    #[test]
    fn test_pattern_check() {
        let ds = dataset(df! { "Patient_ID" => ["P-001", "p002", "X9"] }.unwrap());
        let rules = RuleSet::new().field(
            "Patient_ID",
            vec![Constraint::Pattern("^[A-Z0-9-]+$".to_string())],
        );
        let result = validator().validate(&ds, &rules).unwrap();
        let invalid = result.errors_of(FindingKind::InvalidFormat).next().unwrap();
        assert_eq!(invalid.rows, ids(&[1]));
    }

    #[test]
    fn test_pattern_matches_prefix() {
        let ds = dataset(df! { "Code" => ["AB12", "12AB"] }.unwrap());
        let rules = RuleSet::new().field("Code", vec![Constraint::Pattern("[A-Z]+".to_string())]);
        let result = validator().validate(&ds, &rules).unwrap();
        let invalid = result.errors_of(FindingKind::InvalidFormat).next().unwrap();
        assert_eq!(invalid.rows, ids(&[1]));
    }

    #[test]
    fn test_bad_pattern_downgraded_to_warning() {
        let ds = dataset(df! { "Code" => ["A"] }.unwrap());
        let rules = RuleSet::new().field(
            "Code",
            vec![
                Constraint::Pattern("([A-Z".to_string()),
                Constraint::MinLength(2),
            ],
        );
        let result = validator().validate(&ds, &rules).unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, FindingKind::FormatCheckFailed);
        // later checks still run
        assert_eq!(result.errors_of(FindingKind::TooShort).count(), 1);
    }

    #[test]
    fn test_allowed_values() {
        let ds = dataset(df! { "Gender" => [Some("M"), Some("X"), None, Some("F")] }.unwrap());
        let rules = RuleSet::surveillance_defaults();
        let result = validator().validate(&ds, &rules).unwrap();

        let invalid = result.errors_of(FindingKind::InvalidValues).next().unwrap();
        assert_eq!(invalid.column, "Gender");
        assert_eq!(invalid.rows, ids(&[1]));
    }

    #[test]
    fn test_numeric_range_both_bounds() {
        let ds = dataset(df! { "Age" => ["25", "-3", "abc", "130", ""] }.unwrap());
        let rules = RuleSet::new().field(
            "Age",
            vec![Constraint::NumericRange {
                min: Some(0.0),
                max: Some(120.0),
            }],
        );
        let result = validator().validate(&ds, &rules).unwrap();

        let kinds: Vec<FindingKind> = result.errors.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FindingKind::NonNumeric,
                FindingKind::BelowMinimum,
                FindingKind::AboveMaximum
            ]
        );
        assert_eq!(result.errors[0].rows, ids(&[2, 4]));
        assert_eq!(result.errors[1].rows, ids(&[1]));
        assert_eq!(result.errors[2].rows, ids(&[3]));
    }

    #[test]
    fn test_native_numeric_column() {
        let ds = dataset(df! { "Age" => [Some(25i64), Some(200), None] }.unwrap());
        let rules = RuleSet::new().field(
            "Age",
            vec![Constraint::NumericRange {
                min: Some(0.0),
                max: Some(120.0),
            }],
        );
        let result = validator().validate(&ds, &rules).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, FindingKind::AboveMaximum);
        assert_eq!(result.errors[0].rows, ids(&[1]));
    }

    #[test]
    fn test_dates() {
        let ds = dataset(
            df! {
                "Date_of_Admission" => [Some("2024-01-01"), Some("not a date"), None, Some("2030-01-01")],
            }
            .unwrap(),
        );
        let rules = RuleSet::new().field("Date_of_Admission", vec![Constraint::Date { not_future: true }]);
        let result = validator().validate(&ds, &rules).unwrap();

        let invalid = result.errors_of(FindingKind::InvalidDates).next().unwrap();
        assert_eq!(invalid.rows, ids(&[1]));
        let future = result.errors_of(FindingKind::FutureDates).next().unwrap();
        assert_eq!(future.rows, ids(&[3]));
    }

    #[test]
    fn test_timestamp_with_trailing_garbage_is_invalid() {
        let ds = dataset(
            df! {
                "Date_of_Admission" => [
                    "2024-01-01",
                    "2024-01-01 08:00:00#corrupt!!",
                    "2024-01-01 08:00:00 UTC",
                ],
            }
            .unwrap(),
        );
        let rules = RuleSet::new().field("Date_of_Admission", vec![Constraint::Date { not_future: true }]);
        let result = validator().validate(&ds, &rules).unwrap();

        let invalid = result.errors_of(FindingKind::InvalidDates).next().unwrap();
        assert_eq!(invalid.rows, ids(&[1]));
        assert_eq!(result.summary.total_errors, 1);
    }

    #[test]
    fn test_column_stats_for_clean_column() {
        let ds = dataset(df! { "Organism" => [Some("E. coli"), Some("E. coli"), None] }.unwrap());
        let rules = RuleSet::new().field("Organism", vec![Constraint::NonEmpty]);
        let result = validator().validate(&ds, &rules).unwrap();

        assert_eq!(
            result.column_stats.get("Organism"),
            Some(&ColumnValidationStats {
                total_rows: 3,
                null_count: 1,
                unique_count: 1,
            })
        );
    }
}
