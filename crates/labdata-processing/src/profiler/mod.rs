//! Data profiling module for dataset analysis.
//!
//! This module provides:
//! - Central type inference and typed value extraction
//! - Descriptive statistics per column
//! - Missing data and duplicate analysis
//! - IQR outlier detection and Pearson correlation
//! - Name/cardinality pattern heuristics (ID, date, categorical, constant)
//!
//! Every section tolerates an empty dataset.

mod statistics;
mod type_inference;

pub use type_inference::{
    date_values, infer_value_type, looks_like_date, numeric_values, parse_date, text_values,
};

pub(crate) use statistics::{calculate_std, mean};

use crate::config::EngineConfig;
use crate::error::{Result, ResultExt};
use crate::types::{
    BooleanStats, ColumnDuplicates, ColumnStats, ColumnSummary, CorrelationPair,
    CorrelationSummary, DataTypeSummary, DateStats, Dataset, DuplicateSummary, MissingColumn,
    MissingDataSummary, OutlierSummary, PatternSummary, Profile, ProfileOverview, TextStats,
    ValueType,
};
use crate::utils::{
    char_len, duplicate_row_count, is_numeric_string, most_common, parse_boolean, percentage,
    round_to,
};
use chrono::{NaiveDateTime, Timelike};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

const ID_KEYWORDS: [&str; 4] = ["id", "key", "index", "number"];
const DATE_KEYWORDS: [&str; 4] = ["date", "time", "created", "updated"];

/// Data profiler for descriptive analysis of a dataset.
#[derive(Debug, Clone)]
pub struct DataProfiler {
    iqr_multiplier: f64,
    correlation_threshold: f64,
    categorical_ratio: f64,
    high_missing_threshold: f64,
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// A column with its inferred type, extracted once and shared by the sections.
struct TypedColumn<'a> {
    column: &'a Column,
    name: String,
    value_type: ValueType,
}

impl DataProfiler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            iqr_multiplier: config.outlier_iqr_multiplier,
            correlation_threshold: config.high_correlation_threshold,
            categorical_ratio: config.categorical_ratio,
            high_missing_threshold: config.high_missing_threshold,
        }
    }

    /// Profile an entire dataset.
    pub fn profile(&self, dataset: &Dataset) -> Result<Profile> {
        info!(
            "Profiling dataset: {} rows x {} columns",
            dataset.height(),
            dataset.width()
        );

        let typed = dataset
            .columns()
            .map(|column| {
                Ok(TypedColumn {
                    column,
                    name: column.name().to_string(),
                    value_type: infer_value_type(column)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let duplicate_rows = duplicate_row_count(dataset.frame()).context("Counting duplicates")?;

        let columns = typed
            .iter()
            .map(|tc| {
                Self::summarize_column(tc, dataset.height())
                    .context(format!("Profiling column '{}'", tc.name))
            })
            .collect::<Result<Vec<_>>>()?;

        let profile = Profile {
            overview: Self::overview(dataset, &typed, duplicate_rows),
            data_types: Self::data_types(&typed)?,
            missing_data: self.missing_data(dataset, &typed),
            duplicates: Self::duplicates(dataset, &columns, duplicate_rows),
            outliers: self.outliers(&typed)?,
            correlations: self.correlations(&typed)?,
            patterns: self.patterns(dataset, &typed, &columns),
            columns,
        };

        debug!(
            "Profile complete: {} outlier columns, {} high correlations",
            profile.outliers.len(),
            profile.correlations.high_correlations.len()
        );

        Ok(profile)
    }

    fn overview(dataset: &Dataset, typed: &[TypedColumn], duplicate_rows: usize) -> ProfileOverview {
        let count_type = |pred: fn(ValueType) -> bool| {
            typed.iter().filter(|tc| pred(tc.value_type)).count()
        };

        ProfileOverview {
            total_rows: dataset.height(),
            total_columns: dataset.width(),
            memory_usage_mb: round_to(
                dataset.frame().estimated_size() as f64 / (1024.0 * 1024.0),
                2,
            ),
            total_cells: dataset.height() * dataset.width(),
            empty_cells: typed.iter().map(|tc| tc.column.null_count()).sum(),
            duplicate_rows,
            numeric_columns: count_type(ValueType::is_numeric),
            text_columns: count_type(|t| t == ValueType::Text),
            date_columns: count_type(|t| t == ValueType::Date),
            boolean_columns: count_type(|t| t == ValueType::Boolean),
        }
    }

    fn summarize_column(tc: &TypedColumn, row_count: usize) -> Result<ColumnSummary> {
        let column = tc.column;
        let null_count = column.null_count();
        let values: Vec<String> = text_values(column)?.into_iter().flatten().collect();
        let unique_count = values.iter().collect::<HashSet<_>>().len();
        let (most_common_value, most_common_count) =
            match most_common(values.iter().map(String::as_str)) {
                Some((value, count)) => (Some(value), count),
                None => (None, 0),
            };

        Ok(ColumnSummary {
            name: tc.name.clone(),
            dtype: tc.value_type,
            non_null_count: values.len(),
            null_count,
            null_percentage: round_to(percentage(null_count, row_count), 2),
            unique_count,
            unique_percentage: round_to(percentage(unique_count, row_count), 2),
            most_common_value,
            most_common_count,
            stats: column_stats(column, tc.value_type)?,
        })
    }

    fn data_types(typed: &[TypedColumn]) -> Result<DataTypeSummary> {
        let mut type_counts: BTreeMap<ValueType, usize> = BTreeMap::new();
        for tc in typed {
            *type_counts.entry(tc.value_type).or_insert(0) += 1;
        }

        let type_percentages = type_counts
            .iter()
            .map(|(t, count)| (*t, round_to(percentage(*count, typed.len()), 2)))
            .collect();

        let mut mixed_type_columns = Vec::new();
        for tc in typed.iter().filter(|tc| tc.value_type == ValueType::Text) {
            let values = text_values(tc.column)?;
            let mut numeric = false;
            let mut non_numeric = false;
            for value in values.iter().flatten().map(|v| v.trim()).filter(|v| !v.is_empty()) {
                if is_numeric_string(value) {
                    numeric = true;
                } else {
                    non_numeric = true;
                }
            }
            if numeric && non_numeric {
                mixed_type_columns.push(tc.name.clone());
            }
        }

        Ok(DataTypeSummary {
            type_counts,
            type_percentages,
            mixed_type_columns,
        })
    }

    fn missing_data(&self, dataset: &Dataset, typed: &[TypedColumn]) -> MissingDataSummary {
        let row_count = dataset.height();
        let mut columns = Vec::new();
        let mut high_missing_columns = Vec::new();
        let mut row_has_missing = vec![false; row_count];

        for tc in typed {
            let missing_count = tc.column.null_count();
            if missing_count == 0 {
                continue;
            }

            let missing_percentage = percentage(missing_count, row_count);
            if missing_percentage > self.high_missing_threshold {
                high_missing_columns.push(tc.name.clone());
            }
            columns.push(MissingColumn {
                column: tc.name.clone(),
                missing_count,
                missing_percentage: round_to(missing_percentage, 2),
            });

            for (position, is_null) in tc.column.is_null().into_iter().enumerate() {
                if is_null == Some(true)
                    && let Some(flag) = row_has_missing.get_mut(position)
                {
                    *flag = true;
                }
            }
        }

        let rows_with_missing = row_has_missing.iter().filter(|m| **m).count();
        MissingDataSummary {
            columns,
            high_missing_columns,
            rows_with_missing,
            rows_with_missing_percentage: round_to(percentage(rows_with_missing, row_count), 2),
        }
    }

    fn duplicates(
        dataset: &Dataset,
        columns: &[ColumnSummary],
        duplicate_rows: usize,
    ) -> DuplicateSummary {
        let column_duplicates = columns
            .iter()
            .filter(|c| c.non_null_count > c.unique_count)
            .map(|c| ColumnDuplicates {
                column: c.name.clone(),
                duplicate_count: c.non_null_count - c.unique_count,
            })
            .collect();

        DuplicateSummary {
            duplicate_rows,
            duplicate_percentage: round_to(percentage(duplicate_rows, dataset.height()), 2),
            column_duplicates,
        }
    }

    fn outliers(&self, typed: &[TypedColumn]) -> Result<Vec<OutlierSummary>> {
        let mut outliers = Vec::new();

        for tc in typed.iter().filter(|tc| tc.value_type.is_numeric()) {
            let values: Vec<f64> = numeric_values(tc.column)?.into_iter().flatten().collect();
            let Some((lower_bound, upper_bound)) =
                statistics::tukey_fences(&values, self.iqr_multiplier)
            else {
                continue;
            };

            let flagged: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| *v < lower_bound || *v > upper_bound)
                .collect();
            if flagged.is_empty() {
                continue;
            }

            debug!("Column '{}': {} outliers", tc.name, flagged.len());
            outliers.push(OutlierSummary {
                column: tc.name.clone(),
                count: flagged.len(),
                percentage: round_to(percentage(flagged.len(), values.len()), 2),
                lower_bound,
                upper_bound,
                values: flagged,
            });
        }

        Ok(outliers)
    }

    fn correlations(&self, typed: &[TypedColumn]) -> Result<CorrelationSummary> {
        let numeric: Vec<&TypedColumn> =
            typed.iter().filter(|tc| tc.value_type.is_numeric()).collect();
        if numeric.len() < 2 {
            return Ok(CorrelationSummary::default());
        }

        let series = numeric
            .iter()
            .map(|tc| numeric_values(tc.column))
            .collect::<PolarsResult<Vec<_>>>()?;

        let n = numeric.len();
        let mut matrix = vec![vec![None; n]; n];
        let mut high_correlations = Vec::new();

        for i in 0..n {
            for j in i..n {
                let r = statistics::pearson(&series[i], &series[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;

                if i < j
                    && let Some(r) = r
                    && r.abs() > self.correlation_threshold
                {
                    high_correlations.push(CorrelationPair {
                        column1: numeric[i].name.clone(),
                        column2: numeric[j].name.clone(),
                        correlation: round_to(r, 3),
                    });
                }
            }
        }

        Ok(CorrelationSummary {
            columns: numeric.iter().map(|tc| tc.name.clone()).collect(),
            matrix,
            high_correlations,
        })
    }

    fn patterns(
        &self,
        dataset: &Dataset,
        typed: &[TypedColumn],
        columns: &[ColumnSummary],
    ) -> PatternSummary {
        let mut patterns = PatternSummary::default();
        let categorical_limit = dataset.height() as f64 * self.categorical_ratio;

        for (tc, summary) in typed.iter().zip(columns) {
            let lower = tc.name.to_lowercase();

            if summary.unique_count <= 1 {
                patterns.constant_columns.push(tc.name.clone());
            }
            if ID_KEYWORDS.iter().any(|k| lower.contains(k)) {
                patterns.id_columns.push(tc.name.clone());
            }
            if DATE_KEYWORDS.iter().any(|k| lower.contains(k)) {
                patterns.date_columns.push(tc.name.clone());
            }
            if tc.value_type == ValueType::Text && (summary.unique_count as f64) < categorical_limit
            {
                patterns.categorical_columns.push(tc.name.clone());
            }
        }

        patterns
    }
}

/// Type-specific statistics for a column of the given inferred type.
pub(crate) fn column_stats(column: &Column, value_type: ValueType) -> PolarsResult<ColumnStats> {
    let stats = match value_type {
        ValueType::Integer | ValueType::Decimal => {
            let values: Vec<f64> = numeric_values(column)?.into_iter().flatten().collect();
            statistics::describe_numeric(&values).map(ColumnStats::Numeric)
        }
        ValueType::Date => {
            let dates: Vec<NaiveDateTime> = date_values(column)?.into_iter().flatten().collect();
            match (dates.iter().min(), dates.iter().max()) {
                (Some(min), Some(max)) => Some(ColumnStats::Date(DateStats {
                    min: format_date(min),
                    max: format_date(max),
                    range_days: (*max - *min).num_days(),
                })),
                _ => None,
            }
        }
        ValueType::Boolean => {
            let flags: Vec<bool> = text_values(column)?
                .iter()
                .flatten()
                .filter_map(|v| parse_boolean(v))
                .collect();
            (!flags.is_empty()).then(|| {
                let true_count = flags.iter().filter(|f| **f).count();
                ColumnStats::Boolean(BooleanStats {
                    true_count,
                    false_count: flags.len() - true_count,
                })
            })
        }
        ValueType::Text => {
            let values: Vec<String> = text_values(column)?.into_iter().flatten().collect();
            describe_text(&values).map(ColumnStats::Text)
        }
    };

    Ok(stats.unwrap_or(ColumnStats::Empty))
}

fn describe_text(values: &[String]) -> Option<TextStats> {
    let lengths: Vec<usize> = values.iter().map(|v| char_len(v)).collect();
    let min_length = *lengths.iter().min()?;
    let max_length = *lengths.iter().max()?;
    let distinct = values.iter().collect::<HashSet<_>>().len();
    let (most_common, most_common_count) = most_common(values.iter().map(String::as_str))?;

    Some(TextStats {
        avg_length: round_to(
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
            2,
        ),
        min_length,
        max_length,
        most_common: Some(most_common),
        most_common_count,
        unique_ratio: round_to(distinct as f64 / values.len() as f64, 3),
    })
}

fn format_date(value: &NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(frame: DataFrame) -> Dataset {
        Dataset::from_dataframe(frame).unwrap()
    }

    fn surveillance_sample() -> Dataset {
        dataset(
            df! {
                "Unique ID" => ["A1", "A2", "A3", "A4", "A5"],
                "Age in years" => [Some(1.0f64), Some(2.0), Some(3.0), Some(4.0), Some(100.0)],
                "Weight" => [Some(2.0f64), Some(4.0), Some(6.0), Some(8.0), Some(200.0)],
                "Country" => ["MWI", "MWI", "MWI", "MWI", "MWI"],
                "Specimen date" => [Some("2024-01-01"), Some("2024-01-03"), None, Some("2024-01-10"), None],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_outlier_flagged_by_iqr() {
        let profile = DataProfiler::default().profile(&surveillance_sample()).unwrap();
        let age = profile.outliers_for("Age in years").unwrap();
        assert_eq!(age.count, 1);
        assert_eq!(age.values, vec![100.0]);
        assert_eq!(age.percentage, 20.0);
    }

    #[test]
    fn test_overview_counts() {
        let profile = DataProfiler::default().profile(&surveillance_sample()).unwrap();
        let overview = &profile.overview;
        assert_eq!(overview.total_rows, 5);
        assert_eq!(overview.total_columns, 5);
        assert_eq!(overview.total_cells, 25);
        assert_eq!(overview.empty_cells, 2);
        assert_eq!(overview.numeric_columns, 2);
        assert_eq!(overview.text_columns, 2);
        assert_eq!(overview.date_columns, 1);
        assert_eq!(overview.duplicate_rows, 0);
    }

    #[test]
    fn test_high_correlation_pairs() {
        let profile = DataProfiler::default().profile(&surveillance_sample()).unwrap();
        let pairs = &profile.correlations.high_correlations;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].column1, "Age in years");
        assert_eq!(pairs[0].column2, "Weight");
        assert_eq!(pairs[0].correlation, 1.0);
        assert_eq!(profile.correlations.matrix.len(), 2);
    }

    #[test]
    fn test_patterns() {
        let profile = DataProfiler::default().profile(&surveillance_sample()).unwrap();
        let patterns = &profile.patterns;
        assert_eq!(patterns.constant_columns, vec!["Country"]);
        assert_eq!(patterns.id_columns, vec!["Unique ID"]);
        assert_eq!(patterns.date_columns, vec!["Specimen date"]);
        // One distinct value over five rows is not below the 10% cutoff.
        assert!(patterns.categorical_columns.is_empty());
    }

    #[test]
    fn test_missing_data_section() {
        let profile = DataProfiler::default().profile(&surveillance_sample()).unwrap();
        let missing = &profile.missing_data;
        assert_eq!(missing.columns.len(), 1);
        assert_eq!(missing.columns[0].column, "Specimen date");
        assert_eq!(missing.columns[0].missing_count, 2);
        assert_eq!(missing.rows_with_missing, 2);
        assert_eq!(missing.rows_with_missing_percentage, 40.0);
        assert!(missing.high_missing_columns.is_empty());
    }

    #[test]
    fn test_column_summary_mode_and_duplicates() {
        let profile = DataProfiler::default().profile(&surveillance_sample()).unwrap();
        let country = profile.columns.iter().find(|c| c.name == "Country").unwrap();
        assert_eq!(country.most_common_value.as_deref(), Some("MWI"));
        assert_eq!(country.most_common_count, 5);
        assert_eq!(
            profile
                .duplicates
                .column_duplicates
                .iter()
                .find(|d| d.column == "Country")
                .map(|d| d.duplicate_count),
            Some(4)
        );
    }

    #[test]
    fn test_mixed_type_columns() {
        let ds = dataset(df! { "Result" => ["12", "pending", "15"] }.unwrap());
        let profile = DataProfiler::default().profile(&ds).unwrap();
        assert_eq!(profile.data_types.mixed_type_columns, vec!["Result"]);
        assert_eq!(profile.data_types.type_counts.get(&ValueType::Text), Some(&1));
    }

    #[test]
    fn test_single_numeric_column_has_no_correlations() {
        let ds = dataset(df! { "Age" => [1i64, 2, 3] }.unwrap());
        let profile = DataProfiler::default().profile(&ds).unwrap();
        assert!(profile.correlations.columns.is_empty());
        assert!(profile.correlations.high_correlations.is_empty());
    }

    #[test]
    fn test_empty_dataset() {
        let profile = DataProfiler::default()
            .profile(&dataset(DataFrame::empty()))
            .unwrap();
        assert_eq!(profile.overview.total_rows, 0);
        assert_eq!(profile.overview.total_cells, 0);
        assert!(profile.columns.is_empty());
        assert!(profile.outliers.is_empty());
        assert_eq!(profile.missing_data.rows_with_missing_percentage, 0.0);
    }

    #[test]
    fn test_zero_row_columns() {
        let ds = dataset(
            DataFrame::new(vec![
                Series::new_empty("Age".into(), &DataType::Int64).into_column(),
                Series::new_empty("Organism".into(), &DataType::String).into_column(),
            ])
            .unwrap(),
        );
        let profile = DataProfiler::default().profile(&ds).unwrap();
        assert_eq!(profile.columns.len(), 2);
        assert_eq!(profile.columns[0].stats, ColumnStats::Empty);
        assert_eq!(profile.duplicates.duplicate_percentage, 0.0);
    }
}
