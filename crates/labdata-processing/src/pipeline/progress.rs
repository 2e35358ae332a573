//! Progress reporting for the processing pipeline.
//!
//! ```rust,ignore
//! use labdata_processing::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(dataset)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the processing pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Inferring column types and samples
    SchemaAnalysis,
    /// Choosing a mapping (manual, history or suggestion)
    Mapping,
    /// Reshaping the dataset with the chosen mapping
    Reconciliation,
    /// Scoring completeness, consistency, accuracy, validity, uniqueness
    QualityAssessment,
    /// Descriptive statistics, outliers, correlations, patterns
    Profiling,
    /// Evaluating the rule table
    Validation,
    Complete,
    Failed,
}

impl ProcessingStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SchemaAnalysis => "Analyzing Schema",
            Self::Mapping => "Mapping Columns",
            Self::Reconciliation => "Reconciling Columns",
            Self::QualityAssessment => "Assessing Quality",
            Self::Profiling => "Profiling Dataset",
            Self::Validation => "Validating Rules",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Cumulative progress (0.0 - 1.0) once this stage has finished.
    pub fn completed_progress(&self) -> f32 {
        match self {
            Self::SchemaAnalysis => 0.15,
            Self::Mapping => 0.25,
            Self::Reconciliation => 0.35,
            Self::QualityAssessment => 0.55,
            Self::Profiling => 0.80,
            Self::Validation => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Overall progress (0.0 - 1.0)
    pub progress: f32,
    pub message: String,
}

impl ProgressUpdate {
    /// Update sent when `stage` has finished.
    pub fn finished(stage: ProcessingStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.completed_progress(),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::finished(ProcessingStage::Complete, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::finished(ProcessingStage::Failed, message)
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline can run on a worker
/// thread while updates go to another.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_stage_progress_is_monotonic() {
        let stages = [
            ProcessingStage::SchemaAnalysis,
            ProcessingStage::Mapping,
            ProcessingStage::Reconciliation,
            ProcessingStage::QualityAssessment,
            ProcessingStage::Profiling,
            ProcessingStage::Validation,
            ProcessingStage::Complete,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].completed_progress() < pair[1].completed_progress());
        }
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ClosureProgressReporter::new(move |update: ProgressUpdate| {
            sink.lock().push(update.stage);
        });

        reporter.report(ProgressUpdate::finished(ProcessingStage::Mapping, "done"));
        reporter.report(ProgressUpdate::complete("all done"));

        assert_eq!(
            *seen.lock(),
            vec![ProcessingStage::Mapping, ProcessingStage::Complete]
        );
    }

    #[test]
    fn test_update_serializes_snake_case() {
        let json =
            serde_json::to_value(ProgressUpdate::finished(ProcessingStage::QualityAssessment, "ok"))
                .unwrap();
        assert_eq!(json["stage"], "quality_assessment");
    }
}
