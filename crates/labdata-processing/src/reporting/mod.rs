//! Report generation module.
//!
//! [`ProcessingReport`] bundles every stage's output of a pipeline run for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use labdata_processing::reporting::ReportGenerator;
//!
//! let generator = ReportGenerator::new("output", "ward_a");
//! let report = generator.build_report(&pipeline_result);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! generator.write_report(&report)?;
//! ```

mod generator;

pub use generator::{ProcessingReport, ReportGenerator, ShapeSummary, Verdict};
