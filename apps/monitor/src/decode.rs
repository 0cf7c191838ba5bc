// [apps/monitor/src/decode.rs]
//! Decodes a synthesized line back into a [`Sample`], the same technique
//! `apps/worker`'s family task uses to tee traffic into a divergence window.

use std::collections::HashMap;

use loadgen_models::Sample;
use loadgen_protocol::{decode, Record};

pub fn sample_from_line(family_id: &str, now: i64, line: &str) -> Option<Sample> {
    let record = decode(line).ok()?;
    let (timestamp, value, source, tags) = match record {
        Record::Metric(r) | Record::Delta(r) => (r.timestamp.unwrap_or(now), r.value, r.source, r.tags),
        Record::Histogram(r) => {
            let mean = r.centroids.first().map(|(_, mean)| *mean).unwrap_or(0.0);
            (r.timestamp, mean, r.source, r.tags)
        }
        Record::Span(r) => (now, r.duration_ms as f64, r.source, r.tags),
    };
    let mut tag_map = HashMap::new();
    for (key, value) in tags {
        tag_map.insert(key, value);
    }
    Some(Sample {
        family_id: family_id.to_string(),
        timestamp,
        value,
        source,
        tags: tag_map,
        line_size: line.len(),
    })
}
