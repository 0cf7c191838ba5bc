// [libs/core/protocol/src/escape.rs]
//! Token escaping for the wire grammar: a token that is already a bare
//! identifier is emitted unquoted; anything else is double-quoted with `"`
//! and `\` backslash-escaped inside.

/// A token may be written bare if every character is alphanumeric, `.`,
/// `_`, or `-`. Everything else (spaces, `=`, quotes, unicode) forces
/// quoting.
fn is_bare(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Escapes a token for inclusion in an encoded line. Applied after any
/// value substitution has already happened.
pub fn escape_token(token: &str) -> String {
    if is_bare(token) {
        return token.to_string();
    }
    let mut out = String::with_capacity(token.len() + 2);
    out.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Reverses `escape_token`: strips surrounding quotes and un-escapes `\"`
/// and `\\`. Returns the input unchanged if it isn't quoted.
pub fn unescape_token(token: &str) -> String {
    let Some(inner) = token.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return token.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
