//! Dataset quality scoring.
//!
//! Five ratio metrics (completeness, consistency, accuracy, validity,
//! uniqueness) combine into a weighted overall score. Threshold breaches
//! become issues, and each issue maps to one recommendation.

mod assessor;

pub use assessor::{
    ACCURACY_THRESHOLD, ACCURACY_WEIGHT, COMPLETENESS_THRESHOLD, COMPLETENESS_WEIGHT,
    CONSISTENCY_THRESHOLD, CONSISTENCY_WEIGHT, QualityAssessor, SUSPICIOUS_CHARS,
    UNIQUENESS_THRESHOLD, UNIQUENESS_WEIGHT, VALIDITY_WEIGHT,
};
