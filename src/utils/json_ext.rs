//! JSON value helpers used by edge-condition evaluation.
//!
//! Collects the truthiness, containment, and numeric comparison rules in one
//! place so conditional routing behaves identically everywhere a JSON value
//! is tested.

use serde_json::Value;
use std::cmp::Ordering;

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]`, and `{}` are falsy;
/// everything else is truthy.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use weftrun::utils::json_ext::is_truthy;
///
/// assert!(is_truthy(&json!("text")));
/// assert!(is_truthy(&json!([1])));
/// assert!(!is_truthy(&json!(null)));
/// assert!(!is_truthy(&json!("")));
/// assert!(!is_truthy(&json!(0)));
/// ```
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Containment check used by the `contains` condition operator.
///
/// - Arrays contain a needle when any element equals it.
/// - Strings contain a needle when the needle is a substring.
/// - Objects contain a needle when the needle names an existing key.
#[must_use]
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| item == needle),
        Value::String(s) => needle.as_str().map(|n| s.contains(n)).unwrap_or(false),
        Value::Object(map) => needle
            .as_str()
            .map(|key| map.contains_key(key))
            .unwrap_or(false),
        _ => false,
    }
}

/// Numeric comparison for the `greater-than`/`less-than` operators.
///
/// Returns `None` when either side is not a finite number.
#[must_use]
pub fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    let l = left.as_f64()?;
    let r = right.as_f64()?;
    l.partial_cmp(&r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness_table() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));

        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!(-0.5)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([0])));
        assert!(is_truthy(&json!({"k": null})));
    }

    #[test]
    fn test_contains_variants() {
        assert!(contains(&json!([1, 2, 3]), &json!(2)));
        assert!(!contains(&json!([1, 2, 3]), &json!(4)));
        assert!(contains(&json!("hello world"), &json!("world")));
        assert!(contains(&json!({"key": 1}), &json!("key")));
        assert!(!contains(&json!(42), &json!(42)));
    }

    #[test]
    fn test_compare_numbers() {
        assert_eq!(
            compare_numbers(&json!(2), &json!(1)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_numbers(&json!(1.5), &json!(2)), Some(Ordering::Less));
        assert_eq!(compare_numbers(&json!("2"), &json!(1)), None);
    }
}
