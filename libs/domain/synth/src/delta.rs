// [libs/domain/synth/src/delta.rs]
//! Per-minute delta-counter accumulator, keyed by (name, source, tag-tuple)
//! and bucketed by the record's own timestamp so replay stays
//! deterministic regardless of wall-clock drift.

use std::collections::HashMap;

/// Canonical key for one delta series: name, source, and tags sorted by
/// key so tag insertion order never splits a series in two.
fn series_key(name: &str, source: &str, tags: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = tags.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let mut key = format!("{name}\0{source}");
    for (k, v) in sorted {
        key.push('\0');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    minute: i64,
    total: f64,
}

/// Accumulates delta increments per minute bucket, one bucket per series.
/// A new minute resets that series' running total to the fresh increment.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    buckets: HashMap<String, Bucket>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `increment` to the running total for the series at
    /// `record_timestamp`'s minute, resetting if the minute has rolled
    /// over, and returns the updated total.
    pub fn accumulate(
        &mut self,
        name: &str,
        source: &str,
        tags: &[(String, String)],
        record_timestamp: i64,
        increment: f64,
    ) -> f64 {
        let minute = record_timestamp.div_euclid(60);
        let key = series_key(name, source, tags);
        let bucket = self.buckets.entry(key).or_insert(Bucket { minute, total: 0.0 });
        if bucket.minute != minute {
            bucket.minute = minute;
            bucket.total = 0.0;
        }
        bucket.total += increment;
        bucket.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_within_one_minute() {
        let mut acc = DeltaAccumulator::new();
        let tags = vec![];
        let first = acc.accumulate("cpu.util", "host-01", &tags, 1_700_000_000, 1.5);
        let second = acc.accumulate("cpu.util", "host-01", &tags, 1_700_000_030, 2.5);
        assert_eq!(first, 1.5);
        assert_eq!(second, 4.0);
    }

    #[test]
    fn resets_on_minute_rollover() {
        let mut acc = DeltaAccumulator::new();
        let tags = vec![];
        acc.accumulate("cpu.util", "host-01", &tags, 1_700_000_000, 1.5);
        let next_minute = acc.accumulate("cpu.util", "host-01", &tags, 1_700_000_061, 3.0);
        assert_eq!(next_minute, 3.0);
    }

    #[test]
    fn distinct_tag_tuples_are_independent_series() {
        let mut acc = DeltaAccumulator::new();
        let a = acc.accumulate(
            "cpu.util",
            "host-01",
            &[("region".into(), "us".into())],
            1_700_000_000,
            1.0,
        );
        let b = acc.accumulate(
            "cpu.util",
            "host-01",
            &[("region".into(), "eu".into())],
            1_700_000_000,
            1.0,
        );
        assert_eq!(a, 1.0);
        assert_eq!(b, 1.0);
    }

    #[test]
    fn tag_insertion_order_does_not_split_series() {
        let mut acc = DeltaAccumulator::new();
        let a = acc.accumulate(
            "req.count",
            "host-01",
            &[("a".into(), "1".into()), ("b".into(), "2".into())],
            1_700_000_000,
            1.0,
        );
        let b = acc.accumulate(
            "req.count",
            "host-01",
            &[("b".into(), "2".into()), ("a".into(), "1".into())],
            1_700_000_010,
            1.0,
        );
        assert_eq!(a, 1.0);
        assert_eq!(b, 2.0);
    }
}
