//! Numeric coercion shared by inputs, thresholds and literals.

use serde_json::Value;

/// Convert a JSON value to a number using loose scripting-style coercion.
///
/// Numbers pass through, booleans become `1`/`0`, and strings are parsed
/// after trimming (decimal, exponent, `0x`/`0o`/`0b` prefixes, `Infinity`).
/// `null`, blank strings and `[]` become `0`. A single-element array
/// converts its element as text would. Objects, longer arrays and anything
/// yielding NaN are rejected.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => parse_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => Some(0.0),
            // A lone boolean stringifies to "true"/"false", which is NaN.
            [Value::Bool(_)] => None,
            [item] => to_number(item),
            _ => None,
        },
        Value::Object(_) => None,
    }
}

/// Parse a numeric string. Returns `None` for anything that is not a
/// finite number or an explicit infinity.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (sign, unsigned) = match text.as_bytes()[0] {
        b'-' => (-1.0, &text[1..]),
        b'+' => (1.0, &text[1..]),
        _ => (1.0, text),
    };

    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    // Radix prefixes are only valid without a sign.
    if sign > 0.0 && !text.starts_with('+') {
        for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
            if let Some(digits) = unsigned.strip_prefix(prefix) {
                return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
            }
        }
    }

    // `f64::from_str` also accepts "inf" and "nan"; restrict to plain numerals.
    if !unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }

    text.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Build a JSON number, preferring an integer representation when exact.
///
/// Returns `None` for non-finite values, which JSON cannot represent.
pub fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(Value::Number)
}
