//! Shared utilities for the surveillance data engine.
//!
//! Small string and dtype helpers used by the analyzer, profiler, quality
//! assessor and validator.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType holds calendar dates.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Count rows identical to an earlier row (every row after the first of its group).
pub fn duplicate_row_count(df: &DataFrame) -> PolarsResult<usize> {
    if df.width() == 0 || df.height() < 2 {
        return Ok(0);
    }
    let unique = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    Ok(df.height() - unique.height())
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Parse a trimmed string as a finite number.
///
/// Formatting characters such as currency symbols or thousands separators
/// are not stripped: `"$12"` is not a number.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Check if a string can be parsed as a number.
pub fn is_numeric_string(s: &str) -> bool {
    parse_number(s).is_some()
}

/// Check if a numeric string looks like a float (decimal point, exponent or
/// fractional part).
pub fn looks_like_float(s: &str) -> bool {
    let trimmed = s.trim();
    match parse_number(trimmed) {
        Some(num) => trimmed.contains(['.', 'e', 'E']) || num.fract() != 0.0,
        None => false,
    }
}

/// Count the characters of a string (not bytes).
#[inline]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

// =============================================================================
// Frequency Utilities
// =============================================================================

/// Most frequent value and its count. Ties go to the value seen first.
pub fn most_common<'a, I>(values: I) -> Option<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, (count, _))| (value.to_string(), count))
}

// =============================================================================
// Boolean Detection Utilities
// =============================================================================

/// Common boolean true representations.
pub const BOOLEAN_TRUE_VALUES: [&str; 6] = ["true", "yes", "1", "t", "y", "on"];

/// Common boolean false representations.
pub const BOOLEAN_FALSE_VALUES: [&str; 6] = ["false", "no", "0", "f", "n", "off"];

/// Parse a string as a boolean using the common representations.
pub fn parse_boolean(s: &str) -> Option<bool> {
    let lower = s.trim().to_ascii_lowercase();
    if BOOLEAN_TRUE_VALUES.contains(&lower.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE_VALUES.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Check if a string represents a boolean value (true or false).
pub fn is_boolean_string(s: &str) -> bool {
    parse_boolean(s).is_some()
}

/// Round to a fixed number of decimal places.
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 when `whole` is zero.
#[inline]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

// =============================================================================
// Tests
// =============================================================================
