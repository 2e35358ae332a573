//! Configuration types for the surveillance data engine.
//!
//! Tunables are exposed through a builder. Quality weights and issue cutoffs
//! live as constants in [`crate::quality`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by the analyzer, reconciler, profiler and pipeline.
///
/// Use [`EngineConfig::builder()`] to create a configuration with a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use labdata_processing::config::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .similarity_threshold(0.85)
///     .exclusive_mapping(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum name similarity for a suggested mapping. A match is accepted
    /// only when its score is strictly greater than this value.
    /// Default: 0.8
    pub similarity_threshold: f64,

    /// Maximum number of sample values kept per column.
    /// Default: 5
    pub sample_size: usize,

    /// Seed for sample value selection.
    /// Default: 42
    pub sample_seed: u64,

    /// Tukey fence multiplier for IQR outlier detection.
    /// Default: 1.5
    pub outlier_iqr_multiplier: f64,

    /// Absolute Pearson r above which a column pair is reported.
    /// Default: 0.7
    pub high_correlation_threshold: f64,

    /// Distinct-value ratio below which a text column counts as categorical.
    /// Default: 0.1
    pub categorical_ratio: f64,

    /// Missing percentage (0-100) above which a column is flagged in the profile.
    /// Default: 50.0
    pub high_missing_threshold: f64,

    /// Whether suggestions make an already-used source unavailable to later
    /// targets (first-match-wins in vocabulary order).
    /// Default: false
    pub exclusive_mapping: bool,

    /// Output directory for generated reports.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Whether the pipeline caller should write reports to disk.
    /// Default: false
    pub generate_reports: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            sample_size: 5,
            sample_seed: 42,
            outlier_iqr_multiplier: 1.5,
            high_correlation_threshold: 0.7,
            categorical_ratio: 0.1,
            high_missing_threshold: 50.0,
            exclusive_mapping: false,
            output_dir: PathBuf::from("output"),
            generate_reports: false,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_unit_range("similarity_threshold", self.similarity_threshold)?;
        check_unit_range("high_correlation_threshold", self.high_correlation_threshold)?;

        if !(self.categorical_ratio > 0.0 && self.categorical_ratio <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "categorical_ratio".to_string(),
                value: self.categorical_ratio,
            });
        }

        if !(0.0..=100.0).contains(&self.high_missing_threshold) {
            return Err(ConfigValidationError::InvalidPercentage {
                field: "high_missing_threshold".to_string(),
                value: self.high_missing_threshold,
            });
        }

        if self.sample_size == 0 {
            return Err(ConfigValidationError::InvalidSampleSize(self.sample_size));
        }

        if !(self.outlier_iqr_multiplier.is_finite() && self.outlier_iqr_multiplier > 0.0) {
            return Err(ConfigValidationError::InvalidMultiplier(
                self.outlier_iqr_multiplier,
            ));
        }

        Ok(())
    }
}

fn check_unit_range(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidThreshold {
            field: field.to_string(),
            value,
        })
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid percentage for '{field}': {value} (must be between 0 and 100)")]
    InvalidPercentage { field: String, value: f64 },

    #[error("Invalid sample size: {0} (must be at least 1)")]
    InvalidSampleSize(usize),

    #[error("Invalid IQR multiplier: {0} (must be positive)")]
    InvalidMultiplier(f64),
}

impl From<ConfigValidationError> for crate::error::ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    similarity_threshold: Option<f64>,
    sample_size: Option<usize>,
    sample_seed: Option<u64>,
    outlier_iqr_multiplier: Option<f64>,
    high_correlation_threshold: Option<f64>,
    categorical_ratio: Option<f64>,
    high_missing_threshold: Option<f64>,
    exclusive_mapping: Option<bool>,
    output_dir: Option<PathBuf>,
    generate_reports: Option<bool>,
}

impl EngineConfigBuilder {
    /// Set the name similarity a suggestion must exceed.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Set the number of sample values kept per column.
    pub fn sample_size(mut self, size: usize) -> Self {
        self.sample_size = Some(size);
        self
    }

    /// Set the seed used when drawing sample values.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Set the Tukey fence multiplier.
    pub fn outlier_iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.outlier_iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the absolute correlation reported as high.
    pub fn high_correlation_threshold(mut self, threshold: f64) -> Self {
        self.high_correlation_threshold = Some(threshold);
        self
    }

    /// Set the distinct-value ratio for categorical detection.
    pub fn categorical_ratio(mut self, ratio: f64) -> Self {
        self.categorical_ratio = Some(ratio);
        self
    }

    /// Set the missing percentage (0-100) that flags a column.
    pub fn high_missing_threshold(mut self, percentage: f64) -> Self {
        self.high_missing_threshold = Some(percentage);
        self
    }

    /// Enable or disable first-match-wins suggestions.
    pub fn exclusive_mapping(mut self, exclusive: bool) -> Self {
        self.exclusive_mapping = Some(exclusive);
        self
    }

    /// Set the output directory for reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Enable or disable report generation.
    pub fn generate_reports(mut self, generate: bool) -> Self {
        self.generate_reports = Some(generate);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
            sample_size: self.sample_size.unwrap_or(defaults.sample_size),
            sample_seed: self.sample_seed.unwrap_or(defaults.sample_seed),
            outlier_iqr_multiplier: self
                .outlier_iqr_multiplier
                .unwrap_or(defaults.outlier_iqr_multiplier),
            high_correlation_threshold: self
                .high_correlation_threshold
                .unwrap_or(defaults.high_correlation_threshold),
            categorical_ratio: self.categorical_ratio.unwrap_or(defaults.categorical_ratio),
            high_missing_threshold: self
                .high_missing_threshold
                .unwrap_or(defaults.high_missing_threshold),
            exclusive_mapping: self.exclusive_mapping.unwrap_or(defaults.exclusive_mapping),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            generate_reports: self.generate_reports.unwrap_or(defaults.generate_reports),
        };

        config.validate()?;
        Ok(config)
    }
}
