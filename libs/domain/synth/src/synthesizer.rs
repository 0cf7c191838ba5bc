// [libs/domain/synth/src/synthesizer.rs]
//! Family Synthesizer: turns a validated [`Recipe`] plus a seeded RNG into
//! a stream of protocol lines, honoring target rate, schema drift, and
//! error injection.

use std::collections::HashMap;

use rand::Rng;
use rand_distr::{Distribution, Exp};

use loadgen_models::recipe::{IntervalPatternKind, Recipe, RecipeLoadError, SchemaKind};
use loadgen_protocol::{
    encode, HistogramGranularity, HistogramRecord, Record, ScalarRecord, SpanRecord,
};
use loadgen_samplers::{
    next_interval_seconds, IntervalPattern, QuantileSampler, StringPatternSampler, WeightedCategorical,
};

use crate::delta::DeltaAccumulator;
use crate::{drift, error_inject};

enum SourceStrategy {
    Categorical(WeightedCategorical),
    Pattern(StringPatternSampler),
    Default,
}

enum TagStrategy {
    Categorical(WeightedCategorical),
    Pattern(StringPatternSampler),
    Heuristic,
}

/// Recipe-driven line generator for one record family. Holds precomputed
/// samplers plus the minute-bucketed delta accumulator; everything else is
/// a pure function of the injected RNG.
pub struct FamilySynthesizer {
    recipe: Recipe,
    value_sampler: QuantileSampler,
    size_sampler: QuantileSampler,
    source_strategy: SourceStrategy,
    tag_strategies: HashMap<String, TagStrategy>,
    deltas: DeltaAccumulator,
}

impl FamilySynthesizer {
    /// Fails with [`RecipeLoadError`] if the recipe itself is malformed;
    /// once constructed, sampling never fails.
    #[tracing::instrument(skip(recipe), fields(family_id = %recipe.family_id))]
    pub fn new(recipe: Recipe) -> Result<Self, RecipeLoadError> {
        recipe.validate()?;

        let source_strategy = if !recipe.source_distribution.is_empty() {
            SourceStrategy::Categorical(WeightedCategorical::new(&recipe.source_distribution))
        } else if let Some(pattern) = recipe.string_patterns.get("source") {
            SourceStrategy::Pattern(StringPatternSampler::new(pattern))
        } else {
            SourceStrategy::Default
        };

        let mut tag_strategies = HashMap::new();
        for key in recipe.schema.tag_keys.keys() {
            let strategy = if let Some(dist) = recipe.tag_distributions.get(key) {
                TagStrategy::Categorical(WeightedCategorical::new(dist))
            } else if let Some(pattern) = recipe.string_patterns.get(key) {
                TagStrategy::Pattern(StringPatternSampler::new(pattern))
            } else {
                TagStrategy::Heuristic
            };
            tag_strategies.insert(key.clone(), strategy);
        }

        let value_sampler = QuantileSampler::new(recipe.value_distribution.clone());
        let size_sampler = QuantileSampler::new(recipe.size_quantiles.clone());

        Ok(Self {
            recipe,
            value_sampler,
            size_sampler,
            source_strategy,
            tag_strategies,
            deltas: DeltaAccumulator::new(),
        })
    }

    pub fn family_id(&self) -> &str {
        &self.recipe.family_id
    }

    /// `rate = base · intensity[minute_of_day(now)] · multiplier`; with
    /// probability 0.1 the intensity is inflated by `1+(burst-1)·U` to
    /// realize a Hawkes-like burst.
    pub fn target_rate<R: Rng + ?Sized>(
        &self,
        now: i64,
        base: f64,
        multiplier: f64,
        burst: f64,
        rng: &mut R,
    ) -> f64 {
        let mut intensity = self.recipe.intensity_at(now);
        if rng.gen_bool(0.1) {
            let u: f64 = rng.gen_range(0.0..1.0);
            intensity *= 1.0 + (burst - 1.0) * u;
        }
        base * intensity * multiplier
    }

    /// Per-record timestamp offsets (whole seconds, non-decreasing) for
    /// `count` records about to be synthesized in one pacing tick, drawn
    /// from the recipe's `interval_pattern` via the time-interval sampler
    /// (spec.md §4.2's fourth sampler) rather than stamping every record in
    /// the tick with the same timestamp.
    pub fn record_offsets<R: Rng + ?Sized>(&self, now: i64, count: usize, rng: &mut R) -> Vec<i64> {
        let pattern = match self.recipe.interval_pattern {
            IntervalPatternKind::Uniform => IntervalPattern::Uniform,
            IntervalPatternKind::Poisson => IntervalPattern::Poisson,
            IntervalPatternKind::Bursty => IntervalPattern::Bursty,
        };
        let intensity = self.recipe.intensity_at(now);
        let burstiness = self.recipe.burstiness.mean;

        let mut cumulative = 0.0f64;
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            let gap = next_interval_seconds(pattern, intensity, burstiness, rng);
            if gap.is_finite() {
                cumulative += gap;
            }
            offsets.push(cumulative.floor() as i64);
        }
        offsets
    }

    fn sample_source<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match &self.source_strategy {
            SourceStrategy::Categorical(c) => c.sample(rng),
            SourceStrategy::Pattern(p) => p.sample(rng),
            SourceStrategy::Default => format!("host-{}", rng.gen_range(0..1000)),
        }
    }

    fn sample_tags<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<(String, String)> {
        let mut tags = Vec::new();
        for (key, schema) in &self.recipe.schema.tag_keys {
            if !rng.gen_bool(schema.presence.clamp(0.0, 1.0)) {
                continue;
            }
            let value = match self.tag_strategies.get(key) {
                Some(TagStrategy::Categorical(c)) => c.sample(rng),
                Some(TagStrategy::Pattern(p)) => p.sample(rng),
                _ => format!("{key}-{}", rng.gen_range(0..100)),
            };
            tags.push((key.clone(), value));
        }
        tags
    }

    /// Produces one encoded, possibly drift- or error-affected, wire line.
    #[tracing::instrument(skip(self, rng), fields(family_id = %self.recipe.family_id))]
    pub fn next_record<R: Rng + ?Sized>(
        &mut self,
        now: i64,
        multiplier: f64,
        schema_drift: f64,
        error_injection: f64,
        rng: &mut R,
    ) -> String {
        let tags = self.sample_tags(rng);
        let source = self.sample_source(rng);

        let mut record = match self.recipe.schema.kind {
            SchemaKind::Span => self.build_span(now, source, tags, rng),
            SchemaKind::Histogram if rng.gen_bool(0.1) => {
                self.build_histogram(now, multiplier, source, tags, rng)
            }
            SchemaKind::Delta => self.build_delta(now, multiplier, source, tags, rng),
            SchemaKind::Histogram | SchemaKind::Metric => {
                self.build_metric(now, multiplier, source, tags, rng)
            }
        };

        let mut drifted_tags = tags_of(&record);
        drift::apply(&mut drifted_tags, schema_drift, rng);
        set_tags(&mut record, drifted_tags);

        let line = encode(&record);
        error_inject::apply(line, error_injection, rng)
    }

    fn build_metric<R: Rng + ?Sized>(
        &self,
        now: i64,
        multiplier: f64,
        source: String,
        tags: Vec<(String, String)>,
        rng: &mut R,
    ) -> Record {
        let value = self.value_sampler.sample(rng) * multiplier;
        Record::Metric(ScalarRecord {
            name: self.recipe.metric_name.clone(),
            value,
            timestamp: Some(now),
            source,
            tags,
        })
    }

    fn build_delta<R: Rng + ?Sized>(
        &mut self,
        now: i64,
        multiplier: f64,
        source: String,
        tags: Vec<(String, String)>,
        rng: &mut R,
    ) -> Record {
        let increment = self.value_sampler.sample(rng) * multiplier;
        let total = self
            .deltas
            .accumulate(&self.recipe.metric_name, &source, &tags, now, increment);
        Record::Delta(ScalarRecord {
            name: self.recipe.metric_name.clone(),
            value: total,
            timestamp: Some(now),
            source,
            tags,
        })
    }

    fn build_histogram<R: Rng + ?Sized>(
        &self,
        now: i64,
        multiplier: f64,
        source: String,
        tags: Vec<(String, String)>,
        rng: &mut R,
    ) -> Record {
        let centroid_count: u64 = rng.gen_range(1..=5);
        // spec.md §4.1: "total count scales with multiplier" — one coherent
        // total is drawn and split evenly across the centroids, not a fresh
        // independent count per centroid (which would sum to roughly
        // `centroid_count`x too much on average).
        let total = ((self.size_sampler.sample(rng).abs() * multiplier).round() as u64).max(1);
        let base = total / centroid_count;
        let remainder = total % centroid_count;
        let centroids = (0..centroid_count)
            .map(|i| {
                let mean = self.value_sampler.sample(rng);
                // distribute the remainder across the first few centroids so
                // the per-centroid counts still sum to exactly `total`.
                let count = (base + if i < remainder { 1 } else { 0 }).max(1);
                (count, mean)
            })
            .collect();
        Record::Histogram(HistogramRecord {
            granularity: HistogramGranularity::Minute,
            timestamp: now,
            centroids,
            name: self.recipe.metric_name.clone(),
            source,
            tags,
        })
    }

    fn build_span<R: Rng + ?Sized>(
        &self,
        now: i64,
        source: String,
        tags: Vec<(String, String)>,
        rng: &mut R,
    ) -> Record {
        let exp = Exp::new(1.0 / 50.0).expect("Exp(1/50) is always valid");
        let duration_ms = exp.sample(rng).max(0.1) as i64;
        Record::Span(SpanRecord {
            operation: self.recipe.metric_name.clone(),
            source,
            tags,
            start_ms: now * 1000,
            duration_ms,
        })
    }
}

fn tags_of(record: &Record) -> Vec<(String, String)> {
    match record {
        Record::Metric(r) | Record::Delta(r) => r.tags.clone(),
        Record::Histogram(r) => r.tags.clone(),
        Record::Span(r) => r.tags.clone(),
    }
}

fn set_tags(record: &mut Record, tags: Vec<(String, String)>) {
    match record {
        Record::Metric(r) | Record::Delta(r) => r.tags = tags,
        Record::Histogram(r) => r.tags = tags,
        Record::Span(r) => r.tags = tags,
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap as StdHashMap;

    use loadgen_models::recipe::{Burstiness, IntervalPatternKind, Schema, SchemaKind, MINUTES_PER_DAY};
    use loadgen_protocol::decode;

    use super::FamilySynthesizer;

    fn recipe_with_multiplier_quantiles() -> loadgen_models::Recipe {
        loadgen_models::Recipe {
            family_id: "cpu.util".into(),
            metric_name: "cpu.util".into(),
            schema: Schema {
                kind: SchemaKind::Metric,
                tag_keys: StdHashMap::new(),
            },
            value_distribution: vec![10.0, 20.0, 42.0, 80.0, 95.0],
            source_distribution: vec![("host-01".into(), 1.0)],
            tag_distributions: StdHashMap::new(),
            intensity_curve: vec![2.0; MINUTES_PER_DAY],
            burstiness: Burstiness {
                mean: 1.0,
                stddev: 0.1,
            },
            size_quantiles: vec![10.0, 20.0, 30.0],
            interval_pattern: IntervalPatternKind::Uniform,
            string_patterns: StdHashMap::new(),
            version: 1,
        }
    }

    proptest! {
        /// Without error injection, every line a synthesizer emits decodes
        /// cleanly regardless of multiplier, schema drift, or seed — the
        /// Family Synthesizer never hands the encoder something it can't
        /// round-trip (spec.md §8 invariant 6, carried through the full
        /// record-composition pipeline rather than the bare encoder alone).
        #[test]
        fn emitted_lines_always_decode_without_error_injection(
            multiplier in 0.1f64..10.0,
            schema_drift in 0.0f64..1.0,
            seed in any::<u64>(),
        ) {
            let mut synth = FamilySynthesizer::new(recipe_with_multiplier_quantiles()).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for i in 0..20 {
                let line = synth.next_record(1_700_000_000 + i, multiplier, schema_drift, 0.0, &mut rng);
                prop_assert!(decode(&line).is_ok(), "failed to decode: {line:?}");
            }
        }
    }
}
