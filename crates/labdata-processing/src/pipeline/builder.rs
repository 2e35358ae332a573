//! Main processing pipeline.
//!
//! Runs the engine stages in order: schema analysis, mapping, reconciliation,
//! quality assessment, profiling and validation.

use crate::config::{ConfigValidationError, EngineConfig};
use crate::error::{ProcessingError, Result};
use crate::mapping::{ColumnReconciler, Mapping, MappingHistory, TargetVocabulary};
use crate::pipeline::progress::{
    ClosureProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::DataProfiler;
use crate::quality::QualityAssessor;
use crate::reporting::ReportGenerator;
use crate::schema::SchemaAnalyzer;
use crate::types::{Dataset, Profile, QualityReport, SchemaSummary};
use crate::validation::{RuleSet, ValidationResult, Validator};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where the applied mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Manual,
    History,
    Suggested,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub schema: SchemaSummary,
    pub mapping: Mapping,
    pub mapping_source: MappingSource,
    /// The reconciled dataset; validation rows refer to its row ids.
    pub dataset: Dataset,
    pub quality: QualityReport,
    pub profile: Profile,
    pub validation: ValidationResult,
    /// Set when the configuration asked for a report on disk.
    pub report_path: Option<PathBuf>,
    pub duration_ms: u64,
}

/// The main processing pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use labdata_processing::{Pipeline, RuleSet, TargetVocabulary};
///
/// let result = Pipeline::builder()
///     .vocabulary(TargetVocabulary::standard())
///     .rules(RuleSet::surveillance_defaults())
///     .build()?
///     .process(dataset)?;
///
/// if result.validation.has_blocking_errors() {
///     println!("{} errors", result.validation.summary.total_errors);
/// }
/// ```
pub struct Pipeline {
    config: EngineConfig,
    vocabulary: TargetVocabulary,
    rules: RuleSet,
    history: Option<Arc<MappingHistory>>,
    manual_mapping: Option<Mapping>,
    source_name: String,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    analyzer: SchemaAnalyzer,
    reconciler: ColumnReconciler,
    profiler: DataProfiler,
    validator: Validator,
}

// Pipelines are shared between request handlers.
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &TargetVocabulary {
        &self.vocabulary
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run every stage over `dataset`.
    ///
    /// Row-level problems end up in the result; only structural faults
    /// (or a failure to write a requested report) return an error.
    pub fn process(&self, dataset: Dataset) -> Result<PipelineResult> {
        match self.process_internal(dataset) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Schema analysis and mapping only, without touching the data.
    pub fn preview(&self, dataset: &Dataset) -> Result<(SchemaSummary, Mapping, MappingSource)> {
        let schema = self.analyzer.analyze(dataset)?;
        let (mapping, source) = self.resolve_mapping(dataset);
        Ok((schema, mapping, source))
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, dataset: Dataset) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!(
            "Starting pipeline for '{}': {} rows x {} columns",
            self.source_name,
            dataset.height(),
            dataset.width()
        );

        // Step 1: Schema analysis
        let schema = self.analyzer.analyze(&dataset)?;
        self.report_progress(ProgressUpdate::finished(
            ProcessingStage::SchemaAnalysis,
            format!("Analyzed {} columns", schema.column_count),
        ));

        // Step 2: Mapping
        let (mut mapping, mapping_source) = self.resolve_mapping(&dataset);
        for (target, source) in mapping.prune_missing(&dataset) {
            warn!(
                "Dropping mapping '{}' -> '{}': source column not present",
                source, target
            );
        }
        for (source, targets) in mapping.collisions() {
            warn!("Source column '{}' mapped to {} targets: {}", source, targets.len(), targets.join(", "));
        }
        self.report_progress(ProgressUpdate::finished(
            ProcessingStage::Mapping,
            format!("{} target fields mapped ({:?})", mapping.len(), mapping_source),
        ));

        // Step 3: Reconciliation
        let source_columns = dataset.column_names();
        let reconciled = self
            .reconciler
            .apply(&dataset, &mapping, &self.vocabulary)?;
        debug!("Reconciled columns: {:?}", reconciled.column_names());
        self.report_progress(ProgressUpdate::finished(
            ProcessingStage::Reconciliation,
            format!("{} columns after reconciliation", reconciled.width()),
        ));

        // Step 4: Remember the confirmed mapping
        if let Some(history) = &self.history
            && !mapping.is_empty()
        {
            history.record(&source_columns, &mapping);
        }

        // Step 5: Quality
        let quality = QualityAssessor::assess(&reconciled)?;
        self.report_progress(ProgressUpdate::finished(
            ProcessingStage::QualityAssessment,
            format!("Overall quality score {:.3}", quality.metrics.overall_score),
        ));

        // Step 6: Profile
        let profile = self.profiler.profile(&reconciled)?;
        self.report_progress(ProgressUpdate::finished(
            ProcessingStage::Profiling,
            format!("{} columns profiled", profile.columns.len()),
        ));

        // Step 7: Validation
        let rules = self.rules_for(&mapping, &reconciled);
        let validation = self.validator.validate(&reconciled, &rules)?;
        self.report_progress(ProgressUpdate::finished(
            ProcessingStage::Validation,
            format!(
                "{} errors, {} warnings",
                validation.summary.total_errors, validation.summary.total_warnings
            ),
        ));

        let mut result = PipelineResult {
            schema,
            mapping,
            mapping_source,
            dataset: reconciled,
            quality,
            profile,
            validation,
            report_path: None,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        if self.config.generate_reports {
            let generator = ReportGenerator::new(&self.config.output_dir, &self.source_name);
            let report = generator.build_report(&result);
            let path = generator
                .write_report(&report)
                .map_err(|e| ProcessingError::ReportGenerationFailed(e.to_string()))?;
            result.report_path = Some(path);
        }

        info!("Pipeline finished in {} ms", result.duration_ms);
        Ok(result)
    }

    /// The rule table re-keyed onto the reconciled column names.
    ///
    /// A rule whose field was consumed by the mapping follows it to the first
    /// emitted target (in vocabulary order) that has no rule of its own.
    /// Rules for columns still present, or never mapped, are unchanged.
    fn rules_for(&self, mapping: &Mapping, reconciled: &Dataset) -> RuleSet {
        let mut rules = RuleSet::new();
        for rule in self.rules.iter() {
            let field = if reconciled.has_column(&rule.field) {
                rule.field.clone()
            } else {
                self.vocabulary
                    .fields()
                    .find(|target| {
                        mapping.get(target) == Some(rule.field.as_str())
                            && reconciled.has_column(target)
                            && self.rules.get(target).is_none()
                    })
                    .map(|target| {
                        debug!("Rule for '{}' checks column '{}'", rule.field, target);
                        target.to_string()
                    })
                    .unwrap_or_else(|| rule.field.clone())
            };
            rules = rules.field(field, rule.constraints.clone());
        }
        rules
    }

    /// Manual mapping first, then history, then a fresh suggestion.
    fn resolve_mapping(&self, dataset: &Dataset) -> (Mapping, MappingSource) {
        if let Some(mapping) = &self.manual_mapping {
            debug!("Using manual mapping with {} entries", mapping.len());
            return (mapping.clone(), MappingSource::Manual);
        }

        let source_columns = dataset.column_names();
        if let Some(history) = &self.history
            && let Some(mapping) = history.lookup(&source_columns)
        {
            info!("Reusing mapping from history ({} entries)", mapping.len());
            return (mapping, MappingSource::History);
        }

        let mapping = if self.config.exclusive_mapping {
            self.reconciler
                .suggest_exclusive(&source_columns, &self.vocabulary)
        } else {
            self.reconciler.suggest(&source_columns, &self.vocabulary)
        };
        (mapping, MappingSource::Suggested)
    }
}

/// Builder for creating a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<EngineConfig>,
    vocabulary: Option<TargetVocabulary>,
    rules: Option<RuleSet>,
    history: Option<Arc<MappingHistory>>,
    mapping: Option<Mapping>,
    reference_time: Option<NaiveDateTime>,
    source_name: Option<String>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the target vocabulary. Defaults to the standard surveillance fields.
    pub fn vocabulary(mut self, vocabulary: TargetVocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Set the validation rules. Defaults to [`RuleSet::surveillance_defaults`].
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Share a mapping history between pipelines.
    ///
    /// Confirmed mappings are recorded after each run and looked up before
    /// falling back to a fresh suggestion.
    pub fn history(mut self, history: Arc<MappingHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Use this mapping instead of a suggested one.
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Fix "now" for future-date checks.
    pub fn reference_time(mut self, reference_time: NaiveDateTime) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    /// Name used in logs and report file names.
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let validator = match self.reference_time {
            Some(time) => Validator::new().with_reference_time(time),
            None => Validator::new(),
        };

        Ok(Pipeline {
            analyzer: SchemaAnalyzer::new(&config),
            reconciler: ColumnReconciler::new(&config),
            profiler: DataProfiler::new(&config),
            validator,
            vocabulary: self.vocabulary.unwrap_or_default(),
            rules: self
                .rules
                .unwrap_or_else(RuleSet::surveillance_defaults),
            history: self.history,
            manual_mapping: self.mapping,
            source_name: self.source_name.unwrap_or_else(|| "dataset".to_string()),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}
