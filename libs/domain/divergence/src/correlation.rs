// [libs/domain/divergence/src/correlation.rs]
//! Pearson correlation between windowed per-minute sample counts and a
//! recipe's intensity curve.

/// `None` if either series has zero variance (undefined correlation) or the
/// series lengths don't match.
pub fn pearson(observed_counts: &[f64], expected_intensity: &[f64]) -> Option<f64> {
    if observed_counts.len() != expected_intensity.len() || observed_counts.len() < 2 {
        return None;
    }
    let n = observed_counts.len() as f64;
    let mean_x = observed_counts.iter().sum::<f64>() / n;
    let mean_y = expected_intensity.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in observed_counts.iter().zip(expected_intensity) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfectly_matched_series_correlate_to_one() {
        let observed = vec![1.0, 2.0, 3.0, 4.0];
        let expected = vec![10.0, 20.0, 30.0, 40.0];
        assert!((pearson(&observed, &expected).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_series_correlate_to_minus_one() {
        let observed = vec![1.0, 2.0, 3.0, 4.0];
        let expected = vec![40.0, 30.0, 20.0, 10.0];
        assert!((pearson(&observed, &expected).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_series_has_no_defined_correlation() {
        let observed = vec![5.0, 5.0, 5.0];
        let expected = vec![1.0, 2.0, 3.0];
        assert_eq!(pearson(&observed, &expected), None);
    }

    #[test]
    fn mismatched_lengths_return_none() {
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
    }
}
