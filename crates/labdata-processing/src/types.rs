use crate::error::{ProcessingError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::warn;

// ============================================================================
// Dataset
// ============================================================================

/// Stable identifier of a row, assigned once at ingest.
///
/// Findings reference rows by `RowId` rather than by position so that they
/// stay attached to the right record after the table is reshaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do when two input columns share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with [`ProcessingError::DuplicateColumn`].
    #[default]
    Reject,
    /// Rename later occurrences to `name_2`, `name_3`, ...
    Disambiguate,
}

/// An immutable table with uniquely named columns and stable row ids.
///
/// There is no way to reorder or filter the rows of a `Dataset` in place;
/// row ids are ascending in storage order for the lifetime of the value.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    row_ids: Vec<RowId>,
}

impl Dataset {
    /// Wrap a DataFrame, assigning row ids `0..height`.
    pub fn from_dataframe(frame: DataFrame) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in frame.get_column_names() {
            if !seen.insert(name.as_str()) {
                return Err(ProcessingError::DuplicateColumn(name.to_string()));
            }
        }

        let row_ids = (0..frame.height() as u64).map(RowId).collect();
        Ok(Self { frame, row_ids })
    }

    /// Build a dataset from loose columns, resolving name clashes per `policy`.
    pub fn from_columns(columns: Vec<Column>, policy: DuplicatePolicy) -> Result<Self> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut unique_columns = Vec::with_capacity(columns.len());

        for mut column in columns {
            let name = column.name().to_string();
            if !taken.contains(&name) {
                taken.insert(name);
                unique_columns.push(column);
                continue;
            }

            match policy {
                DuplicatePolicy::Reject => return Err(ProcessingError::DuplicateColumn(name)),
                DuplicatePolicy::Disambiguate => {
                    let renamed = next_free_name(&name, &taken);
                    warn!("Duplicate column '{}' renamed to '{}'", name, renamed);
                    column.rename(renamed.as_str().into());
                    taken.insert(renamed);
                    unique_columns.push(column);
                }
            }
        }

        Self::from_dataframe(DataFrame::new(unique_columns)?)
    }

    /// Pair a frame with row ids carried over from another dataset.
    pub(crate) fn from_parts(frame: DataFrame, row_ids: Vec<RowId>) -> Result<Self> {
        if frame.width() > 0 && frame.height() != row_ids.len() {
            return Err(ProcessingError::RowIdMismatch {
                ids: row_ids.len(),
                height: frame.height(),
            });
        }
        Ok(Self { frame, row_ids })
    }

    /// Borrow the underlying frame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consume the dataset, returning the frame.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn height(&self) -> usize {
        self.row_ids.len()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.frame
            .column(name)
            .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))
    }

    /// Iterate over columns in table order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.frame.get_columns().iter()
    }

    /// Row id stored at `position`.
    pub fn row_id(&self, position: usize) -> Option<RowId> {
        self.row_ids.get(position).copied()
    }

    /// Translate a list of positions into row ids.
    pub fn row_ids_at(&self, positions: &[usize]) -> Vec<RowId> {
        positions.iter().filter_map(|&p| self.row_id(p)).collect()
    }

    /// Resolve a row id back to its position in this dataset.
    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.row_ids.binary_search(&id).ok()
    }
}

impl TryFrom<DataFrame> for Dataset {
    type Error = ProcessingError;

    fn try_from(frame: DataFrame) -> Result<Self> {
        Self::from_dataframe(frame)
    }
}

/// First of `base_2`, `base_3`, ... not present in `taken`.
pub(crate) fn next_free_name(base: &str, taken: &HashSet<String>) -> String {
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// ============================================================================
// Inferred Types
// ============================================================================

/// Semantic type of a column, inferred once and consumed everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Decimal,
    Date,
    Boolean,
    Text,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Decimal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Date => "date",
            ValueType::Boolean => "boolean",
            ValueType::Text => "text",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Column Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    /// Bias-corrected sample skewness; `None` with fewer than three values.
    pub skewness: Option<f64>,
    /// Bias-corrected excess kurtosis; `None` with fewer than four values.
    pub kurtosis: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateStats {
    pub min: String,
    pub max: String,
    pub range_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub avg_length: f64,
    pub min_length: usize,
    pub max_length: usize,
    pub most_common: Option<String>,
    pub most_common_count: usize,
    pub unique_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanStats {
    pub true_count: usize,
    pub false_count: usize,
}

/// Type-specific statistics. `Empty` when the column has no non-null value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric(NumericStats),
    Date(DateStats),
    Text(TextStats),
    Boolean(BooleanStats),
    Empty,
}

// ============================================================================
// Schema Summary
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub native_dtype: String,
    pub inferred_type: ValueType,
    pub unique_count: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub unique_percentage: f64,
    pub sample_values: Vec<String>,
    pub stats: ColumnStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub columns: Vec<ColumnProfile>,
    pub row_count: usize,
    pub column_count: usize,
    pub memory_usage_mb: f64,
}

impl SchemaSummary {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverview {
    pub total_rows: usize,
    pub total_columns: usize,
    pub memory_usage_mb: f64,
    pub total_cells: usize,
    pub empty_cells: usize,
    pub duplicate_rows: usize,
    pub numeric_columns: usize,
    pub text_columns: usize,
    pub date_columns: usize,
    pub boolean_columns: usize,
}

/// Per-column profile with the most common value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: ValueType,
    pub non_null_count: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    pub unique_count: usize,
    pub unique_percentage: f64,
    pub most_common_value: Option<String>,
    pub most_common_count: usize,
    pub stats: ColumnStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTypeSummary {
    pub type_counts: BTreeMap<ValueType, usize>,
    pub type_percentages: BTreeMap<ValueType, f64>,
    /// Text columns holding both numeric and non-numeric values.
    pub mixed_type_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingColumn {
    pub column: String,
    pub missing_count: usize,
    pub missing_percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissingDataSummary {
    /// Only columns with at least one missing value, in table order.
    pub columns: Vec<MissingColumn>,
    pub high_missing_columns: Vec<String>,
    pub rows_with_missing: usize,
    pub rows_with_missing_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDuplicates {
    pub column: String,
    pub duplicate_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateSummary {
    pub duplicate_rows: usize,
    pub duplicate_percentage: f64,
    pub column_duplicates: Vec<ColumnDuplicates>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub column1: String,
    pub column2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub columns: Vec<String>,
    /// Square matrix in `columns` order. `None` where r is undefined.
    pub matrix: Vec<Vec<Option<f64>>>,
    pub high_correlations: Vec<CorrelationPair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternSummary {
    pub constant_columns: Vec<String>,
    pub id_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub overview: ProfileOverview,
    pub columns: Vec<ColumnSummary>,
    pub data_types: DataTypeSummary,
    pub missing_data: MissingDataSummary,
    pub duplicates: DuplicateSummary,
    pub outliers: Vec<OutlierSummary>,
    pub correlations: CorrelationSummary,
    pub patterns: PatternSummary,
}

impl Profile {
    pub fn outliers_for(&self, column: &str) -> Option<&OutlierSummary> {
        self.outliers.iter().find(|o| o.column == column)
    }
}

// ============================================================================
// Quality
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Quality dimension that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Completeness,
    Consistency,
    Accuracy,
    Uniqueness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub completeness: f64,
    pub consistency: f64,
    pub accuracy: f64,
    pub validity: f64,
    pub uniqueness: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub metrics: QualityMetrics,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df! {
            "Patient_ID" => ["P001", "P002", "P003"],
            "Age" => [25i64, 40, 61],
        }
        .unwrap()
    }

    #[test]
    fn test_from_dataframe_assigns_sequential_ids() {
        let dataset = Dataset::from_dataframe(sample_frame()).unwrap();
        assert_eq!(dataset.row_ids(), &[RowId(0), RowId(1), RowId(2)]);
        assert_eq!(dataset.height(), 3);
        assert_eq!(dataset.width(), 2);
        assert_eq!(dataset.position_of(RowId(2)), Some(2));
        assert_eq!(dataset.position_of(RowId(9)), None);
    }

    #[test]
    fn test_from_columns_rejects_duplicates() {
        let columns = vec![
            Series::new("Age".into(), &[1i64, 2]).into_column(),
            Series::new("Age".into(), &[3i64, 4]).into_column(),
        ];
        let err = Dataset::from_columns(columns, DuplicatePolicy::Reject).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_COLUMN");
    }

    #[test]
    fn test_from_columns_disambiguates_duplicates() {
        let columns = vec![
            Series::new("Age".into(), &[1i64, 2]).into_column(),
            Series::new("Age".into(), &[3i64, 4]).into_column(),
            Series::new("Age_2".into(), &[5i64, 6]).into_column(),
        ];
        // The second "Age" must skip the already-taken "Age_2".
        let columns = vec![columns[0].clone(), columns[2].clone(), columns[1].clone()];
        let dataset = Dataset::from_columns(columns, DuplicatePolicy::Disambiguate).unwrap();
        assert_eq!(dataset.column_names(), vec!["Age", "Age_2", "Age_3"]);
    }

    #[test]
    fn test_from_parts_checks_height() {
        let err = Dataset::from_parts(sample_frame(), vec![RowId(0)]).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::RowIdMismatch { ids: 1, height: 3 }
        ));
    }

    #[test]
    fn test_column_not_found() {
        let dataset = Dataset::from_dataframe(sample_frame()).unwrap();
        assert!(dataset.has_column("Age"));
        assert_eq!(
            dataset.column("Gender").unwrap_err().error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_value_type_serialization() {
        assert_eq!(serde_json::to_string(&ValueType::Decimal).unwrap(), "\"decimal\"");
        assert!(ValueType::Integer.is_numeric());
        assert!(!ValueType::Date.is_numeric());
    }
}
