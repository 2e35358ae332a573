use crate::config::EngineConfig;
use crate::error::{Result, ResultExt};
use crate::profiler::{column_stats, infer_value_type, text_values};
use crate::types::{ColumnProfile, Dataset, SchemaSummary};
use crate::utils::{percentage, round_to};
use polars::prelude::*;
use rand::prelude::*;
use tracing::{debug, info};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Infers per-column type, cardinality, null rate and example values.
#[derive(Debug, Clone)]
pub struct SchemaAnalyzer {
    sample_size: usize,
    seed: u64,
}

impl Default for SchemaAnalyzer {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl SchemaAnalyzer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sample_size: config.sample_size,
            seed: config.sample_seed,
        }
    }

    /// Analyze every column of the dataset.
    ///
    /// Percentages are relative to the row count and are 0 for a dataset
    /// without rows.
    pub fn analyze(&self, dataset: &Dataset) -> Result<SchemaSummary> {
        let row_count = dataset.height();
        info!(
            "Analyzing schema: {} rows x {} columns",
            row_count,
            dataset.width()
        );

        let columns = dataset
            .columns()
            .map(|column| {
                self.profile_column(column, row_count)
                    .context(format!("Analyzing column '{}'", column.name()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SchemaSummary {
            columns,
            row_count,
            column_count: dataset.width(),
            memory_usage_mb: round_to(dataset.frame().estimated_size() as f64 / BYTES_PER_MB, 2),
        })
    }

    fn profile_column(&self, column: &Column, row_count: usize) -> Result<ColumnProfile> {
        let inferred_type = infer_value_type(column)?;
        let missing_count = column.null_count();
        let unique_count = column.drop_nulls().n_unique()?;

        let non_null: Vec<String> = text_values(column)?.into_iter().flatten().collect();
        let sample_values = self.sample(&non_null);

        debug!(
            "Column '{}': {} ({} missing, {} unique)",
            column.name(),
            inferred_type,
            missing_count,
            unique_count
        );

        Ok(ColumnProfile {
            name: column.name().to_string(),
            native_dtype: format!("{:?}", column.dtype()),
            inferred_type,
            unique_count,
            missing_count,
            missing_percentage: round_to(percentage(missing_count, row_count), 2),
            unique_percentage: round_to(percentage(unique_count, row_count), 2),
            sample_values,
            stats: column_stats(column, inferred_type)?,
        })
    }

    /// Draw up to `sample_size` values without replacement.
    fn sample(&self, values: &[String]) -> Vec<String> {
        if values.is_empty() {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let amount = self.sample_size.min(values.len());
        values.choose_multiple(&mut rng, amount).cloned().collect()
    }
}
