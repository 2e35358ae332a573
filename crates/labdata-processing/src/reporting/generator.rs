use crate::error::Result;
use crate::mapping::Mapping;
use crate::pipeline::{MappingSource, PipelineResult};
use crate::types::{Profile, QualityReport, SchemaSummary};
use crate::validation::ValidationResult;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Pass/fail outcome of a run. Any validation error fails it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_validation(validation: &ValidationResult) -> Self {
        if validation.has_blocking_errors() {
            Verdict::Fail
        } else {
            Verdict::Pass
        }
    }
}

/// Shape of the dataset before and after reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeSummary {
    pub rows: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub mapped_fields: usize,
    pub duration_ms: u64,
}

/// Combined report for JSON output (`--json`) and file output (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    /// Local timestamp when the report was generated
    pub generated_at: String,
    pub source_name: String,
    pub verdict: Verdict,
    pub shape: ShapeSummary,
    pub schema: SchemaSummary,
    /// Target field -> source column
    pub mapping: Mapping,
    pub mapping_source: MappingSource,
    pub quality: QualityReport,
    pub profile: Profile,
    pub validation: ValidationResult,
}

/// Builds [`ProcessingReport`]s and writes them to an output directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    name: String,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            name: name.into(),
        }
    }

    pub fn build_report(&self, result: &PipelineResult) -> ProcessingReport {
        ProcessingReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source_name: self.name.clone(),
            verdict: Verdict::from_validation(&result.validation),
            shape: ShapeSummary {
                rows: result.dataset.height(),
                columns_before: result.schema.column_count,
                columns_after: result.dataset.width(),
                mapped_fields: result.mapping.len(),
                duration_ms: result.duration_ms,
            },
            schema: result.schema.clone(),
            mapping: result.mapping.clone(),
            mapping_source: result.mapping_source,
            quality: result.quality.clone(),
            profile: result.profile.clone(),
            validation: result.validation.clone(),
        }
    }

    /// Write `report` as pretty JSON to `<output_dir>/<name>_report.json`.
    pub fn write_report(&self, report: &ProcessingReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", file_stem(&self.name)));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}

/// Keep alphanumerics, `-` and `_`; everything else becomes `_`.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "dataset".to_string()
    } else {
        stem
    }
}
