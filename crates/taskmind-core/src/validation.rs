//! Total normalizers that turn untrusted JSON values into bounded fields.
//!
//! None of these functions can fail: any value that does not satisfy the
//! target field is replaced by the field default. The `*_checked` variants
//! additionally report whether a substitution happened so callers can log
//! the repair.

use serde_json::Value;
use std::str::FromStr;

/// Longest string kept for a single list item (tag, subtask, suggestion).
pub const MAX_ITEM_CHARS: usize = 120;

/// A normalized value plus whether it differs from what the input said.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub repaired: bool,
}

impl<T> Normalized<T> {
    fn kept(value: T) -> Self {
        Self {
            value,
            repaired: false,
        }
    }

    fn substituted(value: T) -> Self {
        Self {
            value,
            repaired: true,
        }
    }
}

/// Loose numeric coercion of a JSON value.
///
/// Numbers pass through, numeric strings are parsed (an empty string is 0),
/// booleans map to 1/0 and `null` to 0. Missing values, arrays, objects
/// and unparseable strings have no numeric reading.
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Round to one decimal place.
pub fn round_one_decimal(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

pub fn validate_range_checked(
    value: Option<&Value>,
    min: f64,
    max: f64,
    default: f64,
) -> Normalized<f64> {
    match coerce_number(value) {
        Some(n) if n >= min && n <= max => {
            let rounded = round_one_decimal(n);
            if rounded == n {
                Normalized::kept(rounded)
            } else {
                Normalized::substituted(rounded)
            }
        }
        _ => Normalized::substituted(default),
    }
}

/// Coerce to a number in `[min, max]` rounded to one decimal, else `default`.
pub fn validate_range(value: Option<&Value>, min: f64, max: f64, default: f64) -> f64 {
    validate_range_checked(value, min, max, default).value
}

pub fn validate_enum_checked<T: FromStr>(value: Option<&Value>, default: T) -> Normalized<T> {
    match value.and_then(Value::as_str).map(str::parse::<T>) {
        Some(Ok(member)) => Normalized::kept(member),
        _ => Normalized::substituted(default),
    }
}

/// Membership test against the enum's fixed set, else `default`.
pub fn validate_enum<T: FromStr>(value: Option<&Value>, default: T) -> T {
    validate_enum_checked(value, default).value
}

/// Non-arrays become empty; arrays are truncated to `max_len` in order.
pub fn validate_array(value: Option<&Value>, max_len: usize) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.iter().take(max_len).cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn validate_string_list_checked(
    value: Option<&Value>,
    max_len: usize,
) -> Normalized<Vec<String>> {
    let Some(Value::Array(items)) = value else {
        return Normalized::substituted(Vec::new());
    };

    let strings: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(s, MAX_ITEM_CHARS))
        .take(max_len)
        .collect();

    let untouched = strings.len() == items.len()
        && strings
            .iter()
            .zip(items)
            .all(|(s, v)| v.as_str() == Some(s.as_str()));

    if untouched {
        Normalized::kept(strings)
    } else {
        Normalized::substituted(strings)
    }
}

/// Array-of-strings normalizer.
///
/// Non-string and blank entries are dropped before truncation so junk
/// entries do not consume slots.
pub fn validate_string_list(value: Option<&Value>, max_len: usize) -> Vec<String> {
    validate_string_list_checked(value, max_len).value
}

/// Trimmed string or `None` when missing, non-string or blank.
pub fn non_empty_string(value: Option<&Value>, max_chars: usize) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(s, max_chars))
}

/// JSON truthiness: `null`, `false`, `0`, `""` and missing are falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
