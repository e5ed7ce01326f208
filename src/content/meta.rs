//! Front-matter value helpers: term normalization, loose equality, ordering
//!
//! Tags and categories show up in three encodings: a native YAML list, a
//! string holding a JSON list (`'["a","b"]'`), or a comma-separated string
//! (`"a, b"`). All three decode to the same ordered list of terms.

use std::cmp::Ordering;

use serde_yaml::Value;

use super::frontmatter::scalar_to_string;

/// Decode a tag or category value into a list of terms
pub fn normalize_terms(value: Option<&Value>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };

    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(s) if s.trim_start().starts_with('[') => decode_json_list(s),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Tagged(tagged) => normalize_terms(Some(&tagged.value)),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

/// A string that looks like a JSON list but does not decode yields no terms
fn decode_json_list(s: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<serde_json::Value>>(s) {
        Ok(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        Err(e) => {
            tracing::debug!("Ignoring undecodable term list {:?}: {}", s, e);
            Vec::new()
        }
    }
}

/// Append terms to `acc`, skipping ones already present
pub fn merge_unique(acc: &mut Vec<String>, terms: impl IntoIterator<Item = String>) {
    for term in terms {
        if !acc.contains(&term) {
            acc.push(term);
        }
    }
}

/// Loose equality between front-matter values.
///
/// Scalars compare numerically when both sides read as numbers and by their
/// string form otherwise, so `"42"` equals `42` and `"true"` equals `true`.
/// Collections compare structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Sequence(_), _) | (Value::Mapping(_), _) => a == b,
        (_, Value::Sequence(_)) | (_, Value::Mapping(_)) => false,
        _ => {
            if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
                return x == y;
            }
            match (scalar_to_string(a), scalar_to_string(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
    }
}

/// Ordering used by `sort_by`. Missing values sort as null, before anything
/// else; numbers compare numerically, everything else by string form.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
                return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            }
            let x = scalar_to_string(a).unwrap_or_default();
            let y = scalar_to_string(b).unwrap_or_default();
            x.cmp(&y)
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
