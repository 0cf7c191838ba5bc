// [libs/core/protocol/src/value.rs]
//! Numeric value formatting: magnitude-based precision, with NaN/±∞
//! collapsed to `0` rather than propagated into the wire format.

/// Formats a metric value per the wire grammar's precision rule:
/// non-finite values become `"0"`; otherwise decimal places scale down as
/// magnitude grows, so a dashboard never sees more precision than the
/// value's own scale warrants.
pub fn format_value(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let magnitude = v.abs();
    let decimals = if magnitude < 1e-3 {
        6
    } else if magnitude < 1.0 {
        3
    } else if magnitude < 1e3 {
        1
    } else {
        0
    };
    format!("{v:.decimals$}")
}
