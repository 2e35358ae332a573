//! Pipeline module.
//!
//! Orchestrates the engine stages and reports progress.

mod builder;
pub mod progress;

pub use builder::{MappingSource, Pipeline, PipelineBuilder, PipelineResult};
pub use progress::{ClosureProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate};
