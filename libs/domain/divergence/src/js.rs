// [libs/domain/divergence/src/js.rs]
//! Categorical Jensen-Shannon divergence between a recipe's reference tag
//! distribution and the live counts observed in a window.

use std::collections::HashMap;

/// `reference` is a label -> weight table (weights need not sum to 1);
/// `observed` is label -> raw count from the current window. Labels present
/// in only one side are treated as having probability 0 on the other.
/// Returns a value in `[0, 1]`, normalized by `ln 2`; clamped defensively
/// since the un-halved `KL(p||m) + KL(q||m)` sum this crate reports (per
/// spec.md's worked divergence-red scenario) can exceed one `ln 2` unit at
/// the extremes.
pub fn js_divergence(reference: &[(String, f64)], observed: &HashMap<String, u64>) -> f64 {
    let ref_total: f64 = reference.iter().map(|(_, w)| w).sum();
    let obs_total: f64 = observed.values().sum::<u64>() as f64;
    if ref_total <= 0.0 || obs_total <= 0.0 {
        return 0.0;
    }

    let mut labels: Vec<&str> = reference.iter().map(|(l, _)| l.as_str()).collect();
    for label in observed.keys() {
        if !labels.contains(&label.as_str()) {
            labels.push(label.as_str());
        }
    }

    let ref_weight = |label: &str| -> f64 {
        reference
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, w)| w / ref_total)
            .unwrap_or(0.0)
    };
    let obs_weight =
        |label: &str| -> f64 { *observed.get(label).unwrap_or(&0) as f64 / obs_total };

    let mut divergence = 0.0;
    for label in labels {
        let p = ref_weight(label);
        let q = obs_weight(label);
        let m = (p + q) / 2.0;
        if m <= 0.0 {
            continue;
        }
        if p > 0.0 {
            divergence += p * (p / m).ln();
        }
        if q > 0.0 {
            divergence += q * (q / m).ln();
        }
    }
    (divergence / std::f64::consts::LN_2).clamp(0.0, 1.0)
}
