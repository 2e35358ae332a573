//! Lab Surveillance Data Processing Library
//!
//! Schema inference, column reconciliation and quality checks for laboratory
//! surveillance (antimicrobial resistance) datasets, built on Polars.
//!
//! # Overview
//!
//! - **Schema Analysis**: per-column type, cardinality, null rate and samples
//! - **Column Reconciliation**: fuzzy suggestions against a fixed target
//!   vocabulary, manual overrides, and reshaping
//! - **Quality Assessment**: five 0-1 metrics, a weighted score, issues and
//!   recommendations
//! - **Profiling**: descriptive statistics, IQR outliers, correlations and
//!   name/cardinality patterns
//! - **Validation**: a declarative per-field rule table with findings that
//!   reference stable row ids
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use labdata_processing::{Dataset, Pipeline, RuleSet, TargetVocabulary};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("lab.csv".into()))?
//!     .finish()?;
//!
//! let result = Pipeline::builder()
//!     .vocabulary(TargetVocabulary::standard())
//!     .rules(RuleSet::surveillance_defaults())
//!     .build()?
//!     .process(Dataset::from_dataframe(df)?)?;
//!
//! println!("Quality: {:.3}", result.quality.metrics.overall_score);
//! for error in &result.validation.errors {
//!     println!("{}: {}", error.kind, error.message);
//! }
//! ```
//!
//! # Using the stages directly
//!
//! Every stage is usable on its own:
//!
//! ```rust,ignore
//! use labdata_processing::*;
//!
//! let schema = SchemaAnalyzer::default().analyze(&dataset)?;
//!
//! let reconciler = ColumnReconciler::default();
//! let vocabulary = TargetVocabulary::standard();
//! let mut mapping = reconciler.suggest(&dataset.column_names(), &vocabulary);
//! mapping.assign("Organism", "bug_name");
//! let reconciled = reconciler.apply(&dataset, &mapping, &vocabulary)?;
//!
//! let quality = QualityAssessor::assess(&reconciled)?;
//! let profile = DataProfiler::default().profile(&reconciled)?;
//! let validation = Validator::new().validate(&reconciled, &RuleSet::surveillance_defaults())?;
//! ```

pub mod config;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;
pub mod validation;

// Re-exports for convenient access
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use mapping::{ColumnReconciler, Mapping, MappingHistory, STANDARD_FIELDS, TargetVocabulary};
pub use pipeline::{
    ClosureProgressReporter, MappingSource, Pipeline, PipelineBuilder, PipelineResult,
    ProcessingStage, ProgressReporter, ProgressUpdate,
};
pub use profiler::{DataProfiler, infer_value_type};
pub use quality::QualityAssessor;
pub use reporting::{ProcessingReport, ReportGenerator, Verdict};
pub use schema::SchemaAnalyzer;
pub use types::{
    ColumnProfile, ColumnStats, Dataset, DuplicatePolicy, Issue, IssueKind, Profile,
    QualityMetrics, QualityReport, RowId, SchemaSummary, Severity, ValueType,
};
pub use validation::{
    Constraint, FieldRule, Finding, FindingKind, RuleSet, ValidationResult, Validator,
};
