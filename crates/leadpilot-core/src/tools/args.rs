//! Lenient readers for model-produced tool arguments.
//!
//! Models send numbers as strings, money with symbols, and blank strings for
//! "unknown". These helpers normalise all of that to `Option`s.

use serde_json::Value;

/// A non-blank string argument, trimmed. Numbers and booleans are stringified.
pub fn string(args: &Value, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// An integer argument. Accepts JSON numbers and strings such as `"12000"`,
/// `"$12,000"` or `"12k"`.
pub fn integer(args: &Value, key: &str) -> Option<i64> {
    match args.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn parse_amount(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_' | ' '))
        .collect();
    let (number, multiplier) = match cleaned.strip_suffix(['k', 'K']) {
        Some(rest) => (rest, 1_000.0),
        None => (cleaned.as_str(), 1.0),
    };
    let value: f64 = number.parse().ok()?;
    let scaled = value * multiplier;
    scaled.is_finite().then(|| scaled.round() as i64)
}
