// [libs/domain/synth/src/error_inject.rs]
//! Error injection: with probability `error_injection`, corrupt an
//! already-encoded line to simulate a misbehaving downstream producer.
//! Operates on the wire line itself (post-encode) since several policies
//! ("truncate", "double the =") are naturally line-level transforms.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    MalformedName,
    StripSource,
    ValueToNan,
    TruncateHalf,
    DoubleEquals,
}

const POLICIES: [Policy; 5] = [
    Policy::MalformedName,
    Policy::StripSource,
    Policy::ValueToNan,
    Policy::TruncateHalf,
    Policy::DoubleEquals,
];

fn malformed_name(line: &str) -> String {
    match line.split_once(' ') {
        Some((head, rest)) => format!("{head}=broken {rest}"),
        None => format!("{line}=broken"),
    }
}

fn strip_source(line: &str) -> String {
    match line.find("source=") {
        Some(start) => {
            let end = line[start..]
                .find(' ')
                .map(|offset| start + offset)
                .unwrap_or(line.len());
            let mut out = line[..start].to_string();
            out.push_str(line[end..].trim_start());
            out.trim_end().to_string()
        }
        None => line.to_string(),
    }
}

fn value_to_nan(line: &str) -> String {
    let mut tokens: Vec<&str> = line.splitn(3, ' ').collect();
    if tokens.len() >= 2 {
        tokens[1] = "NaN";
        tokens.join(" ")
    } else {
        line.to_string()
    }
}

fn truncate_half(line: &str) -> String {
    let half = line.len() / 2;
    let boundary = (0..=half)
        .rev()
        .find(|&i| line.is_char_boundary(i))
        .unwrap_or(0);
    line[..boundary].to_string()
}

fn double_equals(line: &str) -> String {
    match line.find('=') {
        Some(idx) => format!("{}={}", &line[..idx], &line[idx..]),
        None => line.to_string(),
    }
}

/// Applies one of the five corruption policies, chosen uniformly, if
/// `error_injection` fires (a Bernoulli draw). Returns the line unchanged
/// otherwise.
pub fn apply<R: Rng + ?Sized>(line: String, error_injection: f64, rng: &mut R) -> String {
    if error_injection <= 0.0 || !rng.gen_bool(error_injection.min(1.0)) {
        return line;
    }
    let policy = POLICIES[rng.gen_range(0..POLICIES.len())];
    match policy {
        Policy::MalformedName => malformed_name(&line),
        Policy::StripSource => strip_source(&line),
        Policy::ValueToNan => value_to_nan(&line),
        Policy::TruncateHalf => truncate_half(&line),
        Policy::DoubleEquals => double_equals(&line),
    }
}
