//! Type inference and typed value extraction.
//!
//! [`infer_value_type`] is the single place where a column's semantic type
//! is decided. Every other module reads values through the extractors below
//! instead of re-deriving types from raw cells.

use crate::types::ValueType;
use crate::utils::{
    is_boolean_string, is_integer_dtype, is_numeric_dtype, is_numeric_string, is_temporal_dtype,
    looks_like_float, parse_number,
};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// Date pattern regexes - compiled once at startup
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
        Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{4}$").expect("Invalid regex: MM-DD-YYYY"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}(:\d{2})?").expect("Invalid regex: datetime"),
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("Invalid regex: ISO"),
    ]
});

/// Date-only formats, month-first before day-first for slashed dates.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y",
];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Check whether a string has the shape of a date.
pub fn looks_like_date(s: &str) -> bool {
    let trimmed = s.trim();
    DATE_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

/// Parse a date or datetime string. Date-only values resolve to midnight.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // Offset-bearing values are shifted onto the local clock, the same clock
    // the validator uses for "now".
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    // Rendered timestamps can carry a zone name ("2024-01-01 08:00:00 UTC").
    // The zone is not resolved; anything else after the time is rejected.
    if let Some((stamp, zone)) = trimmed.rsplit_once(char::is_whitespace)
        && is_zone_name(zone)
    {
        return DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(stamp.trim_end(), fmt).ok());
    }

    None
}

/// An alphabetic zone abbreviation such as `UTC`, `GMT` or `CEST`.
fn is_zone_name(token: &str) -> bool {
    (2..=5).contains(&token.len()) && token.chars().all(|c| c.is_ascii_uppercase())
}

/// Infer the semantic type of a column.
///
/// Native dtypes decide directly. String columns are tested in order: date,
/// then number (integer unless any value is fractional), then boolean, else
/// text. A test only succeeds when every non-blank value passes it, so the
/// result does not depend on row order. All-null columns are text.
pub fn infer_value_type(column: &Column) -> PolarsResult<ValueType> {
    let dtype = column.dtype();

    if dtype == &DataType::Boolean {
        return Ok(ValueType::Boolean);
    }
    if is_temporal_dtype(dtype) {
        return Ok(ValueType::Date);
    }
    if is_integer_dtype(dtype) {
        return Ok(ValueType::Integer);
    }
    if is_numeric_dtype(dtype) {
        return Ok(ValueType::Decimal);
    }
    if dtype != &DataType::String {
        return Ok(ValueType::Text);
    }

    let values: Vec<&str> = column
        .str()?
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    Ok(classify_strings(&values))
}

fn classify_strings(values: &[&str]) -> ValueType {
    if values.is_empty() {
        return ValueType::Text;
    }

    if values
        .iter()
        .all(|v| looks_like_date(v) && parse_date(v).is_some())
    {
        return ValueType::Date;
    }

    if values.iter().all(|v| is_numeric_string(v)) {
        return if values.iter().any(|v| looks_like_float(v)) {
            ValueType::Decimal
        } else {
            ValueType::Integer
        };
    }

    if values.iter().all(|v| is_boolean_string(v)) {
        return ValueType::Boolean;
    }

    ValueType::Text
}

/// Every cell rendered as text. Nulls stay `None`.
pub fn text_values(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let rendered = if column.dtype() == &DataType::String {
        column.clone()
    } else {
        column.cast(&DataType::String)?
    };

    Ok(rendered
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Every cell coerced to a finite number, `None` where that is impossible.
pub fn numeric_values(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let dtype = column.dtype();

    if is_numeric_dtype(dtype) {
        let floats = column.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect());
    }

    if dtype == &DataType::String {
        return Ok(column
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_number))
            .collect());
    }

    Ok(vec![None; column.len()])
}

/// Every cell parsed as a date or datetime, `None` where that is impossible.
pub fn date_values(column: &Column) -> PolarsResult<Vec<Option<NaiveDateTime>>> {
    let dtype = column.dtype();

    if dtype == &DataType::String || is_temporal_dtype(dtype) {
        return Ok(text_values(column)?
            .into_iter()
            .map(|v| v.as_deref().and_then(parse_date))
            .collect());
    }

    Ok(vec![None; column.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_column(values: &[Option<&str>]) -> Column {
        Series::new("col".into(), values).into_column()
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-01-15").is_some());
        assert!(parse_date("2024/01/15").is_some());
        assert!(parse_date("01/15/2024").is_some());
        assert!(parse_date("15/01/2024").is_some());
        assert!(parse_date("2024-01-15 08:30:00").is_some());
        assert!(parse_date("2024-01-15T08:30:00").is_some());
        assert!(parse_date("2024-01-15T08:30:00Z").is_some());
        assert!(parse_date("2024-13-45").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_parse_date_zone_suffix() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(parse_date("2024-01-01 08:00:00 UTC"), Some(expected));
        assert_eq!(parse_date("2024-01-01 08:00:00  GMT"), Some(expected));
        assert!(parse_date("2024-01-01 08:00:00#corrupt!!").is_none());
        assert!(parse_date("2024-01-01 08:00:00 #corrupt").is_none());
        assert!(parse_date("2024-01-01 08:00:00 utc123").is_none());
        assert!(parse_date("2024-01-01 08:00:00999").is_none());
    }

    #[test]
    fn test_parse_date_offset_uses_local_clock() {
        let value = "2024-06-01T12:00:00+02:00";
        let expected = DateTime::parse_from_rfc3339(value)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(parse_date(value), Some(expected));
    }

    #[test]
    fn test_parse_date_month_first_when_ambiguous() {
        let parsed = parse_date("02/03/2024").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
    }

    #[test]
    fn test_infer_native_types() {
        let ints = Series::new("a".into(), &[1i64, 2, 3]).into_column();
        let floats = Series::new("b".into(), &[1.5f64, 2.0]).into_column();
        let bools = Series::new("c".into(), &[true, false]).into_column();
        assert_eq!(infer_value_type(&ints).unwrap(), ValueType::Integer);
        assert_eq!(infer_value_type(&floats).unwrap(), ValueType::Decimal);
        assert_eq!(infer_value_type(&bools).unwrap(), ValueType::Boolean);
    }

    #[test]
    fn test_infer_string_type_order() {
        let dates = string_column(&[Some("2024-01-01"), Some("2024-02-01"), None]);
        let ints = string_column(&[Some("1"), Some("0"), Some("1")]);
        let decimals = string_column(&[Some("1"), Some("2.5")]);
        let bools = string_column(&[Some("yes"), Some("no"), Some("Y")]);
        let text = string_column(&[Some("E. coli"), Some("12")]);

        assert_eq!(infer_value_type(&dates).unwrap(), ValueType::Date);
        // "1"/"0" are boolean-like too, but numbers are tried first.
        assert_eq!(infer_value_type(&ints).unwrap(), ValueType::Integer);
        assert_eq!(infer_value_type(&decimals).unwrap(), ValueType::Decimal);
        assert_eq!(infer_value_type(&bools).unwrap(), ValueType::Boolean);
        assert_eq!(infer_value_type(&text).unwrap(), ValueType::Text);
    }

    #[test]
    fn test_infer_all_null_is_text() {
        let column = string_column(&[None, None]);
        assert_eq!(infer_value_type(&column).unwrap(), ValueType::Text);
    }

    #[test]
    fn test_numeric_values_from_strings() {
        let column = string_column(&[Some(" 25 "), Some("abc"), None, Some("3.5")]);
        assert_eq!(
            numeric_values(&column).unwrap(),
            vec![Some(25.0), None, None, Some(3.5)]
        );
    }

    #[test]
    fn test_text_values_render_numbers() {
        let column = Series::new("n".into(), &[Some(7i64), None]).into_column();
        assert_eq!(
            text_values(&column).unwrap(),
            vec![Some("7".to_string()), None]
        );
    }

    #[test]
    fn test_date_values_skip_garbage() {
        let column = string_column(&[Some("2024-01-01"), Some("not a date"), None]);
        let values = date_values(&column).unwrap();
        assert!(values[0].is_some());
        assert!(values[1].is_none());
        assert!(values[2].is_none());
    }
}
