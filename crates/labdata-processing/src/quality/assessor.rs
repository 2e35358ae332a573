use crate::error::Result;
use crate::profiler::{calculate_std, infer_value_type, mean, numeric_values, text_values};
use crate::types::{Dataset, Issue, IssueKind, QualityMetrics, QualityReport, Severity, ValueType};
use crate::utils::{duplicate_row_count, round_to};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const COMPLETENESS_WEIGHT: f64 = 0.25;
pub const CONSISTENCY_WEIGHT: f64 = 0.20;
pub const ACCURACY_WEIGHT: f64 = 0.20;
pub const VALIDITY_WEIGHT: f64 = 0.20;
pub const UNIQUENESS_WEIGHT: f64 = 0.15;

pub const COMPLETENESS_THRESHOLD: f64 = 0.9;
pub const CONSISTENCY_THRESHOLD: f64 = 0.8;
pub const ACCURACY_THRESHOLD: f64 = 0.8;
pub const UNIQUENESS_THRESHOLD: f64 = 0.95;

/// Characters that mark a text value as suspicious for the validity metric.
pub const SUSPICIOUS_CHARS: [char; 5] = ['<', '>', '|', '\\', '/'];

/// Values further than this many standard deviations from the mean count as inaccurate.
const ACCURACY_SIGMA: f64 = 3.0;

/// Flagged observations out of the total examined for one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    flagged: usize,
    total: usize,
}

impl Tally {
    /// `1 - flagged/total`, neutral 1.0 when nothing was examined.
    fn score(self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        let score = 1.0 - self.flagged as f64 / self.total as f64;
        if score.is_finite() {
            round_to(score.clamp(0.0, 1.0), 3)
        } else {
            1.0
        }
    }
}

/// Everything the issue rules need besides the metric values.
struct Findings {
    missing_cells: usize,
    empty_columns: Vec<String>,
    inconsistent_checks: usize,
    outlier_values: usize,
    duplicate_rows: usize,
}

/// Computes the five quality metrics, the weighted score and the issue list.
pub struct QualityAssessor;

impl QualityAssessor {
    /// Assess a dataset snapshot.
    ///
    /// Each metric is computed independently; a metric that cannot be
    /// computed falls back to 1.0 with a warning rather than failing the call.
    pub fn assess(dataset: &Dataset) -> Result<QualityReport> {
        info!(
            "Assessing quality: {} rows x {} columns",
            dataset.height(),
            dataset.width()
        );

        let text_columns = Self::columns_of(dataset, |t| t == ValueType::Text);
        let numeric_columns = Self::columns_of(dataset, ValueType::is_numeric);

        let completeness = Self::measure("completeness", Ok(Self::completeness_tally(dataset)));
        let consistency =
            Self::measure("consistency", Self::consistency_tally(&text_columns));
        let accuracy = Self::measure("accuracy", Self::accuracy_tally(&numeric_columns));
        let validity = Self::measure("validity", Self::validity_tally(&text_columns));
        let uniqueness = Self::measure("uniqueness", Self::uniqueness_tally(dataset));

        let metrics = Self::metrics(
            completeness.score(),
            consistency.score(),
            accuracy.score(),
            validity.score(),
            uniqueness.score(),
        );

        let findings = Findings {
            missing_cells: completeness.flagged,
            empty_columns: Self::empty_columns(dataset),
            inconsistent_checks: consistency.flagged,
            outlier_values: accuracy.flagged,
            duplicate_rows: uniqueness.flagged,
        };

        let issues = Self::identify_issues(&metrics, &findings);
        let recommendations = Self::generate_recommendations(&issues);

        debug!(
            "Quality score {:.3} with {} issues",
            metrics.overall_score,
            issues.len()
        );

        Ok(QualityReport {
            metrics,
            issues,
            recommendations,
        })
    }

    /// Combine the five metrics with the fixed weights.
    pub fn metrics(
        completeness: f64,
        consistency: f64,
        accuracy: f64,
        validity: f64,
        uniqueness: f64,
    ) -> QualityMetrics {
        let overall = completeness * COMPLETENESS_WEIGHT
            + consistency * CONSISTENCY_WEIGHT
            + accuracy * ACCURACY_WEIGHT
            + validity * VALIDITY_WEIGHT
            + uniqueness * UNIQUENESS_WEIGHT;

        QualityMetrics {
            completeness,
            consistency,
            accuracy,
            validity,
            uniqueness,
            overall_score: if overall.is_finite() {
                round_to(overall, 3)
            } else {
                1.0
            },
        }
    }

    fn measure(metric: &str, tally: PolarsResult<Tally>) -> Tally {
        match tally {
            Ok(tally) => tally,
            Err(e) => {
                warn!("Could not compute {} metric, using 1.0: {}", metric, e);
                Tally::default()
            }
        }
    }

    fn columns_of(dataset: &Dataset, pred: fn(ValueType) -> bool) -> Vec<&Column> {
        dataset
            .columns()
            .filter(|column| match infer_value_type(column) {
                Ok(value_type) => pred(value_type),
                Err(e) => {
                    warn!("Skipping column '{}' in quality checks: {}", column.name(), e);
                    false
                }
            })
            .collect()
    }

    fn completeness_tally(dataset: &Dataset) -> Tally {
        Tally {
            flagged: dataset.columns().map(|c| c.null_count()).sum(),
            total: dataset.height() * dataset.width(),
        }
    }

    /// Two checks per text column with values: case variants and padding.
    fn consistency_tally(columns: &[&Column]) -> PolarsResult<Tally> {
        let mut tally = Tally::default();

        for column in columns {
            let distinct: HashSet<String> = text_values(column)?.into_iter().flatten().collect();
            if distinct.is_empty() {
                continue;
            }

            let folded: HashSet<String> = distinct.iter().map(|v| v.to_lowercase()).collect();
            if folded.len() < distinct.len() {
                tally.flagged += 1;
            }
            if distinct.iter().any(|v| v.trim() != v.as_str()) {
                tally.flagged += 1;
            }
            tally.total += 2;
        }

        Ok(tally)
    }

    /// Values beyond three sample standard deviations, over numeric columns
    /// with non-zero spread.
    fn accuracy_tally(columns: &[&Column]) -> PolarsResult<Tally> {
        let mut tally = Tally::default();

        for column in columns {
            let values: Vec<f64> = numeric_values(column)?.into_iter().flatten().collect();
            let (Some(avg), Some(std)) = (mean(&values), calculate_std(&values)) else {
                continue;
            };
            if std <= 0.0 {
                continue;
            }

            tally.flagged += values
                .iter()
                .filter(|v| (**v - avg).abs() > ACCURACY_SIGMA * std)
                .count();
            tally.total += values.len();
        }

        Ok(tally)
    }

    fn validity_tally(columns: &[&Column]) -> PolarsResult<Tally> {
        let mut tally = Tally::default();

        for column in columns {
            for value in text_values(column)?.into_iter().flatten() {
                if value.contains(SUSPICIOUS_CHARS) {
                    tally.flagged += 1;
                }
                tally.total += 1;
            }
        }

        Ok(tally)
    }

    fn uniqueness_tally(dataset: &Dataset) -> PolarsResult<Tally> {
        Ok(Tally {
            flagged: duplicate_row_count(dataset.frame())?,
            total: dataset.height(),
        })
    }

    fn empty_columns(dataset: &Dataset) -> Vec<String> {
        if dataset.height() == 0 {
            return Vec::new();
        }
        dataset
            .columns()
            .filter(|c| c.null_count() == c.len())
            .map(|c| c.name().to_string())
            .collect()
    }

    fn identify_issues(metrics: &QualityMetrics, findings: &Findings) -> Vec<Issue> {
        let mut issues = Vec::new();

        if metrics.completeness < COMPLETENESS_THRESHOLD {
            let message = if findings.empty_columns.is_empty() {
                format!("Found {} missing values", findings.missing_cells)
            } else {
                format!("Empty columns found: {}", findings.empty_columns.join(", "))
            };
            issues.push(Issue {
                kind: IssueKind::Completeness,
                severity: Severity::High,
                message,
                count: findings.missing_cells,
            });
        }

        if metrics.consistency < CONSISTENCY_THRESHOLD {
            issues.push(Issue {
                kind: IssueKind::Consistency,
                severity: Severity::Medium,
                message: "Inconsistent formatting detected in text columns".to_string(),
                count: findings.inconsistent_checks,
            });
        }

        if metrics.accuracy < ACCURACY_THRESHOLD {
            issues.push(Issue {
                kind: IssueKind::Accuracy,
                severity: Severity::Medium,
                message: "Potential outliers detected in numeric columns".to_string(),
                count: findings.outlier_values,
            });
        }

        if metrics.uniqueness < UNIQUENESS_THRESHOLD {
            issues.push(Issue {
                kind: IssueKind::Uniqueness,
                severity: Severity::Low,
                message: format!("Duplicate rows found: {}", findings.duplicate_rows),
                count: findings.duplicate_rows,
            });
        }

        issues
    }

    /// One canned remediation per issue, in issue order.
    pub fn generate_recommendations(issues: &[Issue]) -> Vec<String> {
        issues
            .iter()
            .map(|issue| Self::recommendation_for(issue.kind).to_string())
            .collect()
    }

    pub fn recommendation_for(kind: IssueKind) -> &'static str {
        match kind {
            IssueKind::Completeness => "Consider removing empty columns or filling missing values",
            IssueKind::Consistency => "Standardize text formatting using data transformations",
            IssueKind::Accuracy => "Review and validate outlier values",
            IssueKind::Uniqueness => "Remove duplicate rows or investigate why they exist",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset(frame: DataFrame) -> Dataset {
        Dataset::from_dataframe(frame).unwrap()
    }

    #[test]
    fn test_empty_dataset_scores_one() {
        let report = QualityAssessor::assess(&dataset(DataFrame::empty())).unwrap();
        assert_eq!(
            report.metrics,
            QualityMetrics {
                completeness: 1.0,
                consistency: 1.0,
                accuracy: 1.0,
                validity: 1.0,
                uniqueness: 1.0,
                overall_score: 1.0,
            }
        );
        assert!(report.issues.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_zero_rows_with_columns_scores_one() {
        let ds = dataset(
            DataFrame::new(vec![
                Series::new_empty("Organism".into(), &DataType::String).into_column(),
            ])
            .unwrap(),
        );
        let report = QualityAssessor::assess(&ds).unwrap();
        assert_eq!(report.metrics.completeness, 1.0);
        assert_eq!(report.metrics.uniqueness, 1.0);
    }

    #[test]
    fn test_completeness_bounds() {
        let full = dataset(df! { "a" => [1i64, 2], "b" => ["x", "y"] }.unwrap());
        let half = dataset(df! { "a" => [Some(1i64), None], "b" => [None, Some("y")] }.unwrap());
        let none = dataset(
            df! { "a" => [None::<i64>, None], "b" => [None::<&str>, None] }.unwrap(),
        );

        assert_eq!(QualityAssessor::assess(&full).unwrap().metrics.completeness, 1.0);
        assert_eq!(QualityAssessor::assess(&half).unwrap().metrics.completeness, 0.5);
        assert_eq!(QualityAssessor::assess(&none).unwrap().metrics.completeness, 0.0);
    }

    #[test]
    fn test_completeness_issue_lists_empty_columns() {
        let ds = dataset(
            df! {
                "Organism" => [Some("E. coli"), Some("S. aureus")],
                "Notes" => [None::<&str>, None],
            }
            .unwrap(),
        );
        let report = QualityAssessor::assess(&ds).unwrap();
        let issue = &report.issues[0];
        assert_eq!(issue.kind, IssueKind::Completeness);
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.message, "Empty columns found: Notes");
        assert_eq!(issue.count, 2);
        assert_eq!(
            report.recommendations[0],
            "Consider removing empty columns or filling missing values"
        );
    }

    #[test]
    fn test_consistency_flags_case_and_whitespace() {
        let ds = dataset(
            df! {
                "Gender" => ["M", "m", "F"],
                "Organism" => [" E. coli", "E. coli", "S. aureus"],
            }
            .unwrap(),
        );
        let report = QualityAssessor::assess(&ds).unwrap();
        // Four checks, two flagged.
        assert_eq!(report.metrics.consistency, 0.5);
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::Consistency));
    }

    #[test]
    fn test_accuracy_counts_three_sigma_values() {
        let mut values: Vec<i64> = vec![10; 20];
        values.push(1000);
        let ds = dataset(df! { "Age" => values }.unwrap());
        let report = QualityAssessor::assess(&ds).unwrap();
        assert_eq!(report.metrics.accuracy, round_to(1.0 - 1.0 / 21.0, 3));
    }

    #[test]
    fn test_accuracy_ignores_constant_columns() {
        let ds = dataset(df! { "Age" => [5i64, 5, 5] }.unwrap());
        assert_eq!(QualityAssessor::assess(&ds).unwrap().metrics.accuracy, 1.0);
    }

    #[test]
    fn test_validity_flags_suspicious_characters() {
        let ds = dataset(df! { "Institution" => ["QECH", "<script>", "KCH|B", "Zomba"] }.unwrap());
        assert_eq!(QualityAssessor::assess(&ds).unwrap().metrics.validity, 0.5);
    }

    #[test]
    fn test_uniqueness_issue() {
        let ds = dataset(
            df! {
                "Patient" => ["P1", "P1", "P2", "P2"],
                "Age" => [30i64, 30, 40, 40],
            }
            .unwrap(),
        );
        let report = QualityAssessor::assess(&ds).unwrap();
        assert_eq!(report.metrics.uniqueness, 0.5);
        let issue = report
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::Uniqueness)
            .unwrap();
        assert_eq!(issue.message, "Duplicate rows found: 2");
        assert_eq!(issue.severity, Severity::Low);
    }

    #[test]
    fn test_overall_score_weights() {
        let metrics = QualityAssessor::metrics(1.0, 0.5, 1.0, 1.0, 0.0);
        assert_eq!(metrics.overall_score, 0.75);
    }

    #[test]
    fn test_recommendations_follow_issue_order() {
        let issues = vec![
            Issue {
                kind: IssueKind::Uniqueness,
                severity: Severity::Low,
                message: String::new(),
                count: 1,
            },
            Issue {
                kind: IssueKind::Accuracy,
                severity: Severity::Medium,
                message: String::new(),
                count: 1,
            },
        ];
        assert_eq!(
            QualityAssessor::generate_recommendations(&issues),
            vec![
                "Remove duplicate rows or investigate why they exist".to_string(),
                "Review and validate outlier values".to_string(),
            ]
        );
    }
}
