//! Statistical functions for column profiling.
//!
//! All functions take plain slices of finite values; callers drop nulls first.

use crate::types::NumericStats;

/// Arithmetic mean, `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn calculate_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    Some(variance.sqrt())
}

/// Bias-corrected sample skewness. Zero for constant input.
pub(crate) fn calculate_skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }

    let mean = mean(values)?;
    let m2: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let m3: f64 = values.iter().map(|v| (v - mean).powi(3)).sum();
    if m2 == 0.0 {
        return Some(0.0);
    }

    let n = n as f64;
    Some((n * (n - 1.0).sqrt() / (n - 2.0)) * (m3 / m2.powf(1.5)))
}

/// Bias-corrected excess kurtosis. Zero for constant input.
pub(crate) fn calculate_kurtosis(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }

    let mean = mean(values)?;
    let m2: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let m4: f64 = values.iter().map(|v| (v - mean).powi(4)).sum();
    if m2 == 0.0 {
        return Some(0.0);
    }

    let n = n as f64;
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let denominator = (n - 2.0) * (n - 3.0) * m2.powi(2);
    Some(numerator / denominator - adj)
}

/// Sort a copy of the values ascending.
pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile with linear interpolation between closest ranks.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

/// Tukey fences `[Q1 - k*IQR, Q3 + k*IQR]`.
pub(crate) fn tukey_fences(values: &[f64], multiplier: f64) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

/// Pearson correlation over rows where both sides are present.
///
/// `None` with fewer than two complete pairs or when either side is constant.
pub(crate) fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Descriptive statistics for a numeric column, `None` when it is empty.
pub(crate) fn describe_numeric(values: &[f64]) -> Option<NumericStats> {
    let sorted = sorted(values);
    let min = *sorted.first()?;
    let max = *sorted.last()?;

    Some(NumericStats {
        mean: mean(values)?,
        median: quantile_sorted(&sorted, 0.5)?,
        std: calculate_std(values),
        min,
        max,
        skewness: calculate_skewness(values),
        kurtosis: calculate_kurtosis(values),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // ==================== calculate_std tests ====================

    #[test]
    fn test_calculate_std_basic() {
        // Variance = 10 / 4 = 2.5
        let std = calculate_std(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(approx(std, 2.5f64.sqrt()));
    }

    #[test]
    fn test_calculate_std_single_value() {
        assert_eq!(calculate_std(&[5.0]), None);
    }

    #[test]
    fn test_calculate_std_identical_values() {
        assert_eq!(calculate_std(&[5.0, 5.0, 5.0, 5.0]), Some(0.0));
    }

    // ==================== calculate_skewness tests ====================

    #[test]
    fn test_calculate_skewness_symmetric() {
        let skew = calculate_skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(approx(skew, 0.0));
    }

    #[test]
    fn test_calculate_skewness_right_tail() {
        let skew = calculate_skewness(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert!(skew > 2.0);
    }

    #[test]
    fn test_calculate_skewness_needs_three_values() {
        assert_eq!(calculate_skewness(&[1.0, 2.0]), None);
    }

    // ==================== calculate_kurtosis tests ====================

    #[test]
    fn test_calculate_kurtosis_uniform_sequence() {
        // Adjusted excess kurtosis of 1..=5 is -1.2
        let kurt = calculate_kurtosis(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(approx(kurt, -1.2));
    }

    #[test]
    fn test_calculate_kurtosis_constant() {
        assert_eq!(calculate_kurtosis(&[2.0, 2.0, 2.0, 2.0]), Some(0.0));
    }

    // ==================== quantile / fences tests ====================

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(quantile_sorted(&sorted, 0.25).unwrap(), 1.75));
        assert!(approx(quantile_sorted(&sorted, 0.5).unwrap(), 2.5));
        assert!(approx(quantile_sorted(&sorted, 0.75).unwrap(), 3.25));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_tukey_fences_flag_extreme_value() {
        let (lower, upper) = tukey_fences(&[1.0, 2.0, 3.0, 4.0, 100.0], 1.5).unwrap();
        assert!(approx(lower, -1.0));
        assert!(approx(upper, 7.0));
        assert!(100.0 > upper);
    }

    #[test]
    fn test_median_even_count() {
        assert!(approx(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5));
    }

    // ==================== pearson tests ====================

    #[test]
    fn test_pearson_perfect_positive() {
        let xs = [Some(1.0), Some(2.0), Some(3.0)];
        let ys = [Some(2.0), Some(4.0), Some(6.0)];
        assert!(approx(pearson(&xs, &ys).unwrap(), 1.0));
    }

    #[test]
    fn test_pearson_skips_incomplete_pairs() {
        let xs = [Some(1.0), None, Some(2.0), Some(3.0)];
        let ys = [Some(3.0), Some(100.0), Some(2.0), Some(1.0)];
        assert!(approx(pearson(&xs, &ys).unwrap(), -1.0));
    }

    #[test]
    fn test_pearson_constant_column() {
        let xs = [Some(1.0), Some(1.0), Some(1.0)];
        let ys = [Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(pearson(&xs, &ys), None);
    }

    #[test]
    fn test_describe_numeric() {
        let stats = describe_numeric(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!(approx(stats.mean, 2.0));
        assert!(approx(stats.median, 2.0));
        assert_eq!(stats.kurtosis, None);
        assert!(describe_numeric(&[]).is_none());
    }
}
