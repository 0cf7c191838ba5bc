// [libs/domain/synth/src/drift.rs]
//! Schema-drift: with probability `schema_drift`, mutate the tag set to
//! simulate an upstream schema change before encoding.

use rand::Rng;

/// Applies schema drift in place per spec.md §4.3 step 6: 50% chance add a
/// fresh `drift_tag_k=value_v` tag, 30% chance prefix an existing tag
/// value with `drift_`. The two are independent; both, either, or neither
/// may fire on a given call.
pub fn apply<R: Rng + ?Sized>(tags: &mut Vec<(String, String)>, schema_drift: f64, rng: &mut R) {
    if schema_drift <= 0.0 || !rng.gen_bool(schema_drift.min(1.0)) {
        return;
    }
    if rng.gen_bool(0.5) {
        let k: u32 = rng.gen_range(0..1000);
        let v: u32 = rng.gen_range(0..1000);
        tags.push((format!("drift_tag_{k}"), format!("value_{v}")));
    }
    if !tags.is_empty() && rng.gen_bool(0.3) {
        let idx = rng.gen_range(0..tags.len());
        tags[idx].1 = format!("drift_{}", tags[idx].1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn zero_probability_never_drifts() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut tags = vec![("region".to_string(), "us".to_string())];
        let before = tags.clone();
        for _ in 0..100 {
            apply(&mut tags, 0.0, &mut rng);
        }
        assert_eq!(tags, before);
    }

    #[test]
    fn certain_probability_eventually_adds_or_prefixes() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut tags = vec![("region".to_string(), "us".to_string())];
        let mut changed = false;
        for _ in 0..20 {
            let before = tags.clone();
            apply(&mut tags, 1.0, &mut rng);
            if tags != before {
                changed = true;
                break;
            }
        }
        assert!(changed);
    }
}
