// [libs/domain/divergence/src/quantile.rs]
//! Linear-interpolated percentile over a sorted sample, and the shared
//! normalized-distance helpers built on top of it.

/// `sorted` must already be ascending. `p` is clamped to `[0, 1]`.
pub fn quantile_at(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 1.0);
    let scaled = p * (sorted.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = scaled - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Samples `reference` at `k` equally spaced probabilities `i/(k-1)` and
/// returns the matched quantile values from `current`, alongside the
/// reference values themselves.
pub fn matched_quantiles(reference: &[f64], current_sorted: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let k = reference.len();
    if k == 0 {
        return (Vec::new(), Vec::new());
    }
    if k == 1 {
        return (reference.to_vec(), vec![quantile_at(current_sorted, 0.5)]);
    }
    let current: Vec<f64> = (0..k)
        .map(|i| quantile_at(current_sorted, i as f64 / (k - 1) as f64))
        .collect();
    (reference.to_vec(), current)
}

/// `Σ|ref[i]-cur[i]| / range / k`, per spec.md's Wasserstein-like
/// distance. Returns 0 when the reference range collapses to zero.
pub fn wasserstein_like(reference: &[f64], current: &[f64]) -> f64 {
    let k = reference.len();
    if k == 0 {
        return 0.0;
    }
    let range = reference[k - 1] - reference[0];
    if range.abs() < f64::EPSILON {
        return 0.0;
    }
    let sum: f64 = reference
        .iter()
        .zip(current)
        .map(|(r, c)| (r - c).abs())
        .sum();
    sum / range.abs() / k as f64
}

/// `max_i |ref[i]-cur[i]| / range`: the corrected KS-like statistic (a
/// quantile-value discriminator, not the original's self-cancelling
/// `i/k - i/k` comparison).
pub fn ks_like(reference: &[f64], current: &[f64]) -> f64 {
    let k = reference.len();
    if k == 0 {
        return 0.0;
    }
    let range = reference[k - 1] - reference[0];
    if range.abs() < f64::EPSILON {
        return 0.0;
    }
    reference
        .iter()
        .zip(current)
        .map(|(r, c)| (r - c).abs())
        .fold(0.0, f64::max)
        / range.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_at_interpolates_linearly() {
        let sorted = vec![0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile_at(&sorted, 0.0), 0.0);
        assert_eq!(quantile_at(&sorted, 1.0), 40.0);
        assert_eq!(quantile_at(&sorted, 0.5), 20.0);
    }

    #[test]
    fn identical_distributions_yield_zero_distance() {
        let reference = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let current = reference.clone();
        assert_eq!(wasserstein_like(&reference, &current), 0.0);
        assert_eq!(ks_like(&reference, &current), 0.0);
    }

    #[test]
    fn wasserstein_and_ks_scale_with_shift() {
        let reference = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let current = vec![15.0, 25.0, 35.0, 45.0, 55.0];
        assert!(wasserstein_like(&reference, &current) > 0.0);
        assert!(ks_like(&reference, &current) > 0.0);
        // every point shifted by the same absolute amount, so KS (max) and
        // mean-normalized Wasserstein should coincide here.
        assert!((wasserstein_like(&reference, &current) - ks_like(&reference, &current)).abs() < 1e-9);
    }

    #[test]
    fn degenerate_reference_range_returns_zero() {
        let reference = vec![10.0, 10.0, 10.0];
        let current = vec![10.0, 20.0, 5.0];
        assert_eq!(wasserstein_like(&reference, &current), 0.0);
        assert_eq!(ks_like(&reference, &current), 0.0);
    }
}
