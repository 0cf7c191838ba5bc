// [libs/core/samplers/src/pattern.rs]
//! String pattern sampler: a restricted regex subset, weight-selected, then
//! expanded to a concrete string.
//!
//! Recognized patterns: `\d+`, `\d{k}`, `[a-z]+`, `[a-z]{k}`, `[A-Z]+`,
//! `[A-Z]{k}`, `[a-zA-Z0-9]+`. An unrecognized pattern is returned unchanged
//! (spec.md §9's resolution for the "string-pattern expansion precision"
//! design note).

use rand::Rng;

use crate::categorical::WeightedCategorical;

/// Uniform length range used when a pattern's quantifier is `+` rather than
/// a fixed `{k}`.
const PLUS_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 1..=12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Lower,
    Upper,
    AlphaNumeric,
}

impl CharClass {
    fn charset(self) -> &'static [u8] {
        match self {
            CharClass::Digit => b"0123456789",
            CharClass::Lower => b"abcdefghijklmnopqrstuvwxyz",
            CharClass::Upper => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            CharClass::AlphaNumeric => {
                b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Quantifier {
    Plus,
    Exact(usize),
}

/// Parses one of the recognized pattern forms. Returns `None` for anything
/// else, including malformed braces.
fn parse(pattern: &str) -> Option<(CharClass, Quantifier)> {
    let (body, class) = if let Some(rest) = pattern.strip_prefix(r"\d") {
        (rest, CharClass::Digit)
    } else if let Some(rest) = pattern.strip_prefix("[a-z]") {
        (rest, CharClass::Lower)
    } else if let Some(rest) = pattern.strip_prefix("[A-Z]") {
        (rest, CharClass::Upper)
    } else if let Some(rest) = pattern.strip_prefix("[a-zA-Z0-9]") {
        (rest, CharClass::AlphaNumeric)
    } else {
        return None;
    };

    if body == "+" {
        return Some((class, Quantifier::Plus));
    }
    if let Some(inner) = body.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let k: usize = inner.parse().ok()?;
        return Some((class, Quantifier::Exact(k)));
    }
    None
}

/// Expands a single pattern string. Unrecognized input is returned
/// unchanged.
pub fn expand_pattern<R: Rng + ?Sized>(pattern: &str, rng: &mut R) -> String {
    let Some((class, quantifier)) = parse(pattern) else {
        return pattern.to_string();
    };
    let length = match quantifier {
        Quantifier::Plus => rng.gen_range(PLUS_LENGTH_RANGE),
        Quantifier::Exact(k) => k,
    };
    let charset = class.charset();
    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Weight-selects one of several candidate patterns, then expands it.
pub struct StringPatternSampler {
    selector: WeightedCategorical,
}

impl StringPatternSampler {
    pub fn new(patterns: &[(String, f64)]) -> Self {
        Self {
            selector: WeightedCategorical::new(patterns),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let chosen = self.selector.sample(rng);
        expand_pattern(&chosen, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn exact_digit_length_is_honored() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        for _ in 0..20 {
            let s = expand_pattern(r"\d{6}", &mut rng);
            assert_eq!(s.len(), 6);
            assert!(s.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn plus_length_is_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let s = expand_pattern("[a-z]+", &mut rng);
            assert!(PLUS_LENGTH_RANGE.contains(&s.len()));
            assert!(s.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn upper_and_alphanumeric_charsets() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let upper = expand_pattern("[A-Z]{4}", &mut rng);
        assert!(upper.chars().all(|c| c.is_ascii_uppercase()));
        let alnum = expand_pattern("[a-zA-Z0-9]{8}", &mut rng);
        assert_eq!(alnum.len(), 8);
        assert!(alnum.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn unrecognized_pattern_returned_unchanged() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        assert_eq!(expand_pattern(r"\w{3}", &mut rng), r"\w{3}");
        assert_eq!(expand_pattern("literal-token", &mut rng), "literal-token");
    }
}
